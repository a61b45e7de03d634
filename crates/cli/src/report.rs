//! Human-readable and JSON batch reports.

use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

use mp3forge_core::{BatchOutcome, ConversionResult, OutcomeKind};

/// Machine-readable report printed with `--json`.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub batch_id: Option<&'a str>,
    pub kind: Option<OutcomeKind>,
    pub delivered_path: Option<&'a Path>,
    pub error: Option<String>,
    pub results: &'a [ConversionResult],
}

impl<'a> Report<'a> {
    pub fn from_outcome(outcome: &'a BatchOutcome) -> Self {
        Self {
            batch_id: Some(&outcome.batch_id),
            kind: Some(outcome.kind),
            delivered_path: Some(&outcome.delivered_path),
            error: None,
            results: &outcome.results,
        }
    }

    pub fn from_failure(error: String, results: &'a [ConversionResult]) -> Self {
        Self {
            batch_id: None,
            kind: None,
            delivered_path: None,
            error: Some(error),
            results,
        }
    }
}

/// One line per input, in input order.
pub fn render_results(results: &[ConversionResult]) -> String {
    let mut out = String::new();
    for result in results {
        if result.success {
            let output = result
                .output_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let _ = writeln!(out, "  ok    {} -> {}", result.input_file, output);
        } else {
            let reason = result.error.as_deref().unwrap_or("unknown error");
            let _ = writeln!(out, "  FAIL  {}: {}", result.input_file, reason);
        }
    }
    out
}

/// Summary line for a delivered batch.
pub fn render_outcome(outcome: &BatchOutcome) -> String {
    let what = match outcome.kind {
        OutcomeKind::Single => "file",
        OutcomeKind::Archive => "archive",
    };
    format!(
        "{}Converted {} of {} files, {}: {}\n",
        render_results(&outcome.results),
        outcome.succeeded(),
        outcome.results.len(),
        what,
        outcome.delivered_path.display()
    )
}

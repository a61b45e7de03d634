//! Types for the batch module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::converter::DEFAULT_BITRATE_KBPS;
use crate::format::priority_order;

/// One file to convert, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// Where the source bytes live (often a staging path).
    pub source_path: PathBuf,
    /// Name the user knows the file by; drives format detection and naming.
    pub display_name: String,
}

impl InputFile {
    /// Creates a new input file.
    pub fn new(source_path: impl Into<PathBuf>, display_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            display_name: display_name.into(),
        }
    }

    /// Creates an input whose display name is the source's file name.
    pub fn from_path(source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let display_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source_path.to_string_lossy().to_string());
        Self {
            source_path,
            display_name,
        }
    }
}

/// Indices of `files` in dispatch order (stable, by format priority).
pub fn sort_by_priority(files: &[InputFile]) -> Vec<usize> {
    let names: Vec<&str> = files.iter().map(|f| f.display_name.as_str()).collect();
    priority_order(&names)
}

/// Per-batch conversion options.
///
/// Lifecycle events are delivered with `send().await`, so a progress receiver
/// must be drained for the batch to make progress. Per-file percentages use
/// `try_send` and may be dropped.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Target MP3 bitrate in kbps.
    pub bitrate_kbps: u32,
    /// Optional LAME quality hint (0 = best, 9 = fastest).
    pub quality: Option<u8>,
    /// Receives progress events for the batch.
    pub progress: Option<mpsc::Sender<BatchProgress>>,
    /// Stops new files from being dispatched once cancelled.
    pub cancel: Option<CancellationToken>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            quality: None,
            progress: None,
            cancel: None,
        }
    }
}

impl ConversionOptions {
    /// Sets the target bitrate.
    pub fn with_bitrate(mut self, bitrate_kbps: u32) -> Self {
        self.bitrate_kbps = bitrate_kbps;
        self
    }

    /// Sets the quality hint.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Attaches a progress channel.
    pub fn with_progress(mut self, tx: mpsc::Sender<BatchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether the batch has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// Why a file did not convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Extension not in the supported set; the engine was never invoked.
    UnsupportedFormat,
    /// The engine failed for this file.
    Transcode,
    /// The batch was cancelled before this file was dispatched.
    Cancelled,
}

impl FailureKind {
    /// Stable label, also used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::Transcode => "transcode",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome of one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Display name of the input.
    pub input_file: String,
    /// Whether an MP3 was produced.
    pub success: bool,
    /// Path of the produced MP3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Human-readable failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Engine invocations made for this file.
    pub attempts: u32,
    /// Wall time spent on this file in milliseconds.
    pub duration_ms: u64,
}

impl ConversionResult {
    /// A successful conversion.
    pub fn succeeded(
        input_file: impl Into<String>,
        output_path: PathBuf,
        attempts: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            success: true,
            output_path: Some(output_path),
            error: None,
            failure: None,
            attempts,
            duration_ms,
        }
    }

    /// A failed conversion.
    pub fn failed(
        input_file: impl Into<String>,
        failure: FailureKind,
        error: impl Into<String>,
        attempts: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            success: false,
            output_path: None,
            error: Some(error.into()),
            failure: Some(failure),
            attempts,
            duration_ms,
        }
    }

    /// A file that was never dispatched because the batch was cancelled.
    pub fn cancelled(input_file: impl Into<String>) -> Self {
        Self::failed(input_file, FailureKind::Cancelled, "Batch cancelled", 0, 0)
    }
}

/// How the batch result is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Exactly one MP3 was produced and is delivered as-is.
    Single,
    /// Several MP3s were produced and bundled into an archive.
    Archive,
}

impl OutcomeKind {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Archive => "archive",
        }
    }
}

/// Result of a batch with at least one successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Batch identifier.
    pub batch_id: String,
    /// Single file or archive.
    pub kind: OutcomeKind,
    /// The MP3 (single) or archive path to hand to the user.
    pub delivered_path: PathBuf,
    /// One result per input, in input order.
    pub results: Vec<ConversionResult>,
}

impl BatchOutcome {
    /// Number of successful conversions.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Number of failed conversions.
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Results that did not convert.
    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Progress update for batch processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchProgress {
    /// Batch accepted and about to dispatch files.
    Started { batch_id: String, total_files: usize },
    /// A file was handed to the engine.
    FileStarted { index: usize, file: String },
    /// Engine progress for one file (0-100, non-decreasing per file).
    FileProgress {
        index: usize,
        file: String,
        percent: f32,
    },
    /// A file finished, successfully or not.
    FileFinished {
        index: usize,
        file: String,
        success: bool,
        completed: usize,
        total: usize,
    },
    /// Building the archive.
    Packaging { files: usize },
    /// Batch delivered.
    Completed {
        batch_id: String,
        kind: OutcomeKind,
        delivered_path: PathBuf,
        succeeded: usize,
        failed: usize,
    },
    /// Batch failed as a whole.
    Failed { batch_id: String, error: String },
}

mod args;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use std::io::Write;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mp3forge_core::{
    load_config, load_default_config, metrics, validate_config, BatchConverter, BatchError,
    BatchOutcome, BatchProgress, Config, ConversionOptions, Converter, FfmpegConverter, InputFile,
    ZipPackager,
};

use args::Args;
use report::{render_outcome, render_results, Report};

/// Buffer size for batch progress events
const PROGRESS_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.log_json);

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: Args) -> Result<i32> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_default_config().context("Failed to load default configuration")?,
    };
    args.apply(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    let converter = FfmpegConverter::new(config.converter.clone());
    converter
        .validate()
        .await
        .context("FFmpeg is not available; install it or set converter.ffmpeg_path")?;

    let Config {
        output,
        batch,
        archive,
        ..
    } = config;

    let batch = BatchConverter::new(batch, converter, ZipPackager::new(archive));
    let files: Vec<InputFile> = args.files.iter().cloned().map(InputFile::from_path).collect();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);
    let progress_task = tokio::spawn(log_progress(progress_rx));

    let mut options = ConversionOptions::default()
        .with_bitrate(output.bitrate_kbps)
        .with_progress(progress_tx)
        .with_cancel(cancel);
    if let Some(quality) = output.quality {
        options = options.with_quality(quality);
    }

    let result = batch
        .convert_batch(&files, &output.directory, options)
        .await;
    let _ = progress_task.await;

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    write_outcome(&result, &args, &mut stdout.lock(), &mut stderr.lock())
}

/// Writes the batch report to `out` and diagnostics to `err`, returning the
/// process exit code. Stdout carries only the report.
fn write_outcome(
    result: &Result<BatchOutcome, BatchError>,
    args: &Args,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32> {
    let code = match result {
        Ok(outcome) => {
            if args.json {
                let report = Report::from_outcome(outcome);
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                write!(out, "{}", render_outcome(outcome))?;
            }
            0
        }
        Err(e) => {
            let results = e.results().unwrap_or_default();
            if args.json {
                let report = Report::from_failure(e.to_string(), results);
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                write!(out, "{}", render_results(results))?;
                if let BatchError::Packaging { .. } = e {
                    writeln!(err, "Converted files were kept in the output directory")?;
                }
                writeln!(err, "Error: {}", e)?;
            }
            e.exit_code()
        }
    };

    if args.metrics {
        write!(err, "{}", encode_metrics()?)?;
    }

    Ok(code)
}

async fn log_progress(mut rx: mpsc::Receiver<BatchProgress>) {
    while let Some(event) = rx.recv().await {
        match event {
            BatchProgress::Started { total_files, .. } => {
                info!("Converting {} files", total_files);
            }
            BatchProgress::FileFinished {
                file,
                success,
                completed,
                total,
                ..
            } => {
                let status = if success { "done" } else { "failed" };
                info!("[{}/{}] {} {}", completed, total, file, status);
            }
            BatchProgress::Packaging { files } => {
                info!("Packaging {} files", files);
            }
            _ => {}
        }
    }
}

async fn cancel_on_ctrl_c(token: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, finishing in-flight conversions");
        token.cancel();
    }
}

/// Encode core metrics as Prometheus text format.
fn encode_metrics() -> Result<String> {
    let registry = Registry::new();
    for metric in metrics::all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metric")?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp3forge_core::{ConversionResult, FailureKind, OutcomeKind};
    use std::path::PathBuf;

    fn archive_outcome() -> BatchOutcome {
        BatchOutcome {
            batch_id: "b-1".to_string(),
            kind: OutcomeKind::Archive,
            delivered_path: PathBuf::from("/out/converted-files-0101-120000.zip"),
            results: vec![
                ConversionResult::succeeded("a.wav", PathBuf::from("/out/a.mp3"), 1, 5),
                ConversionResult::succeeded("b.flac", PathBuf::from("/out/b.mp3"), 1, 5),
            ],
        }
    }

    #[test]
    fn test_json_report_with_metrics_keeps_stdout_valid() {
        let args = Args::try_parse_from(["mp3forge", "--json", "--metrics", "a.wav"]).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = write_outcome(&Ok(archive_outcome()), &args, &mut out, &mut err).unwrap();

        assert_eq!(code, 0);
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["kind"], "archive");
        assert!(String::from_utf8(err).unwrap().contains("mp3forge_"));
    }

    #[test]
    fn test_failure_exit_code_and_stderr() {
        let args = Args::try_parse_from(["mp3forge", "a.txt"]).unwrap();
        let failed = BatchError::NoSuccessfulConversions {
            results: vec![ConversionResult::failed(
                "a.txt",
                FailureKind::UnsupportedFormat,
                "Unsupported input format: \"txt\"",
                0,
                0,
            )],
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = write_outcome(&Err(failed), &args, &mut out, &mut err).unwrap();

        assert_eq!(code, 2);
        assert!(String::from_utf8(out).unwrap().contains("FAIL  a.txt"));
        assert!(String::from_utf8(err).unwrap().starts_with("Error: "));
    }
}

//! Batch orchestrator implementation.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::archive::Packager;
use crate::converter::{
    validate_bitrate, ConversionJob, Converter, ConverterError, ProgressTracker, MAX_BITRATE_KBPS,
    MIN_BITRATE_KBPS,
};
use crate::format::{assign_output_names, classify};
use crate::metrics;

use super::config::{BatchConfig, RetryConfig};
use super::error::BatchError;
use super::types::{
    sort_by_priority, BatchOutcome, BatchProgress, ConversionOptions, ConversionResult,
    FailureKind, InputFile, OutcomeKind,
};

/// Buffer between the engine's progress channel and the batch channel.
const ENGINE_PROGRESS_BUFFER: usize = 32;

/// Timestamp format used in archive names (day, month, time).
const ARCHIVE_STAMP_FORMAT: &str = "%d%m-%H%M%S";

/// Converts batches of audio files to MP3 and delivers one file or an archive.
///
/// The worker pool is shared by every batch run through the same instance.
pub struct BatchConverter<C: Converter, P: Packager> {
    config: BatchConfig,
    converter: Arc<C>,
    packager: Arc<P>,
    semaphore: Arc<Semaphore>,
}

/// Everything a worker needs to convert one file.
struct FileTask {
    index: usize,
    display_name: String,
    job: ConversionJob,
}

impl<C: Converter + 'static, P: Packager + 'static> BatchConverter<C, P> {
    /// Creates a new batch converter.
    pub fn new(config: BatchConfig, converter: C, packager: P) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_conversions.max(1)));
        Self {
            config,
            converter: Arc::new(converter),
            packager: Arc::new(packager),
            semaphore,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Returns the underlying converter.
    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Converts a batch of files into `output_dir`.
    ///
    /// Per-file failures are recorded in the results and never abort the
    /// batch. Results always come back in input order, one per input.
    ///
    /// An empty `files` list is rejected with [`BatchError::EmptyBatch`]
    /// rather than reported as a batch where nothing converted.
    pub async fn convert_batch(
        &self,
        files: &[InputFile],
        output_dir: &Path,
        options: ConversionOptions,
    ) -> Result<BatchOutcome, BatchError> {
        let batch_id = Uuid::new_v4().to_string();
        let span = info_span!("batch", batch_id = %batch_id, files = files.len());

        let result = self
            .run_batch(&batch_id, files, output_dir, &options)
            .instrument(span)
            .await;

        match &result {
            Ok(outcome) => {
                metrics::BATCHES_TOTAL
                    .with_label_values(&[outcome.kind.as_str()])
                    .inc();
            }
            Err(e) => {
                metrics::BATCHES_TOTAL.with_label_values(&[e.label()]).inc();
                emit(
                    &options.progress,
                    BatchProgress::Failed {
                        batch_id: batch_id.clone(),
                        error: e.to_string(),
                    },
                )
                .await;
            }
        }

        result
    }

    async fn run_batch(
        &self,
        batch_id: &str,
        files: &[InputFile],
        output_dir: &Path,
        options: &ConversionOptions,
    ) -> Result<BatchOutcome, BatchError> {
        if files.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        if files.len() > self.config.max_files {
            warn!(max = self.config.max_files, "Rejecting oversized batch");
            return Err(BatchError::TooManyFiles {
                count: files.len(),
                max: self.config.max_files,
            });
        }
        validate_bitrate(options.bitrate_kbps).map_err(|_| BatchError::InvalidBitrate {
            bitrate_kbps: options.bitrate_kbps,
            min: MIN_BITRATE_KBPS,
            max: MAX_BITRATE_KBPS,
        })?;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| BatchError::OutputDirectory {
                path: output_dir.to_path_buf(),
                source: e,
            })?;

        let display_names: Vec<&str> = files.iter().map(|f| f.display_name.as_str()).collect();
        let output_names = assign_output_names(&display_names);
        let order = sort_by_priority(files);
        let total = files.len();

        info!(
            output_dir = %output_dir.display(),
            bitrate_kbps = options.bitrate_kbps,
            "Starting batch"
        );
        metrics::BATCH_FILES
            .with_label_values(&[])
            .observe(total as f64);
        emit(
            &options.progress,
            BatchProgress::Started {
                batch_id: batch_id.to_string(),
                total_files: total,
            },
        )
        .await;

        let mut slots: Vec<Option<ConversionResult>> = vec![None; total];
        let completed = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for index in order {
            let file = &files[index];

            if options.is_cancelled() {
                let result = ConversionResult::cancelled(&file.display_name);
                finish_file(&options.progress, index, &result, &completed, total).await;
                slots[index] = Some(result);
                continue;
            }

            let class = classify(&file.display_name);
            if !class.supported {
                debug!(file = %file.display_name, extension = %class.extension, "Skipping unsupported file");
                let err = ConverterError::unsupported(&class.extension);
                let result = ConversionResult::failed(
                    &file.display_name,
                    FailureKind::UnsupportedFormat,
                    err.to_string(),
                    0,
                    0,
                );
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&[FailureKind::UnsupportedFormat.as_str()])
                    .inc();
                finish_file(&options.progress, index, &result, &completed, total).await;
                slots[index] = Some(result);
                continue;
            }

            let Some(permit) = self.acquire_slot(options).await else {
                info!(file = %file.display_name, "Batch cancelled before dispatch");
                let result = ConversionResult::cancelled(&file.display_name);
                finish_file(&options.progress, index, &result, &completed, total).await;
                slots[index] = Some(result);
                continue;
            };

            let job = ConversionJob::new(
                format!("{}-{}", batch_id, index),
                file.source_path.clone(),
                output_dir.join(&output_names[index]),
            )
            .with_bitrate(options.bitrate_kbps)
            .with_quality(options.quality)
            .with_source_name(&file.display_name);

            let task = FileTask {
                index,
                display_name: file.display_name.clone(),
                job,
            };
            let converter = Arc::clone(&self.converter);
            let retry = self.config.retry.clone();
            let progress = options.progress.clone();
            let completed = Arc::clone(&completed);

            tasks.spawn(
                async move {
                    let _permit = permit;
                    metrics::CONVERSIONS_ACTIVE.inc();
                    let result = convert_file(converter.as_ref(), &task, &retry, &progress).await;
                    metrics::CONVERSIONS_ACTIVE.dec();
                    finish_file(&progress, task.index, &result, &completed, total).await;
                    (task.index, result)
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "Conversion task failed"),
            }
        }

        let results: Vec<ConversionResult> = slots
            .into_iter()
            .zip(files)
            .map(|(slot, file)| {
                slot.unwrap_or_else(|| {
                    ConversionResult::failed(
                        &file.display_name,
                        FailureKind::Transcode,
                        "Conversion task aborted",
                        0,
                        0,
                    )
                })
            })
            .collect();

        let delivered: Vec<PathBuf> = results
            .iter()
            .filter_map(|r| r.output_path.clone())
            .collect();
        let failed = total - delivered.len();

        let (kind, delivered_path) = match delivered.as_slice() {
            [] => {
                error!(failed, "No files converted");
                return Err(BatchError::NoSuccessfulConversions { results });
            }
            [single] => (OutcomeKind::Single, single.clone()),
            _ => {
                let archive_path = output_dir.join(format!(
                    "{}-{}.{}",
                    self.config.archive_prefix,
                    Local::now().format(ARCHIVE_STAMP_FORMAT),
                    self.packager.extension()
                ));
                emit(
                    &options.progress,
                    BatchProgress::Packaging {
                        files: delivered.len(),
                    },
                )
                .await;

                match self.packager.package(&delivered, &archive_path).await {
                    Ok(summary) => {
                        metrics::ARCHIVES_TOTAL.with_label_values(&["success"]).inc();
                        metrics::ARCHIVE_BYTES
                            .with_label_values(&[])
                            .observe(summary.archive_bytes as f64);
                        info!(
                            archive = %summary.archive_path.display(),
                            entries = summary.entries.len(),
                            bytes = summary.archive_bytes,
                            duration_ms = summary.duration_ms,
                            "Archive built"
                        );
                        (OutcomeKind::Archive, archive_path)
                    }
                    Err(e) => {
                        metrics::ARCHIVES_TOTAL.with_label_values(&["failed"]).inc();
                        error!(error = %e, "Packaging failed, converted files kept");
                        return Err(BatchError::Packaging {
                            source: e,
                            succeeded: delivered.len(),
                            results,
                        });
                    }
                }
            }
        };

        info!(
            kind = kind.as_str(),
            delivered = %delivered_path.display(),
            succeeded = delivered.len(),
            failed,
            "Batch completed"
        );
        emit(
            &options.progress,
            BatchProgress::Completed {
                batch_id: batch_id.to_string(),
                kind,
                delivered_path: delivered_path.clone(),
                succeeded: delivered.len(),
                failed,
            },
        )
        .await;

        Ok(BatchOutcome {
            batch_id: batch_id.to_string(),
            kind,
            delivered_path,
            results,
        })
    }

    /// Waits for a worker slot, giving up if the batch is cancelled first.
    async fn acquire_slot(&self, options: &ConversionOptions) -> Option<OwnedSemaphorePermit> {
        let semaphore = Arc::clone(&self.semaphore);
        let permit = match &options.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            },
            None => semaphore.acquire_owned().await.ok(),
        };
        // Cancellation may land between the wakeups
        permit.filter(|_| !options.is_cancelled())
    }
}

/// Runs the engine for one file, retrying retryable failures.
async fn convert_file<C: Converter>(
    converter: &C,
    task: &FileTask,
    retry: &RetryConfig,
    progress: &Option<mpsc::Sender<BatchProgress>>,
) -> ConversionResult {
    let start = Instant::now();
    let max_attempts = retry.max_attempts.max(1);
    let mut tracker = ProgressTracker::new();
    let mut attempt = 0;

    emit(
        progress,
        BatchProgress::FileStarted {
            index: task.index,
            file: task.display_name.clone(),
        },
    )
    .await;

    loop {
        attempt += 1;
        let attempt_start = Instant::now();
        debug!(file = %task.display_name, attempt, "Converting");

        let outcome = match progress {
            Some(tx) => {
                let (engine_tx, mut engine_rx) = mpsc::channel(ENGINE_PROGRESS_BUFFER);
                let convert = converter.convert_with_progress(task.job.clone(), engine_tx);
                let forward = async {
                    while let Some(update) = engine_rx.recv().await {
                        let before = tracker.current();
                        let percent = tracker.advance(update.percent);
                        if percent > before {
                            let _ = tx.try_send(BatchProgress::FileProgress {
                                index: task.index,
                                file: task.display_name.clone(),
                                percent,
                            });
                        }
                    }
                };
                let (outcome, ()) = tokio::join!(convert, forward);
                outcome
            }
            None => converter.convert(task.job.clone()).await,
        };

        let elapsed = attempt_start.elapsed().as_secs_f64();
        match outcome {
            Ok(output) => {
                metrics::CONVERSION_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);
                metrics::CONVERSIONS_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    file = %task.display_name,
                    output = %output.output_path.display(),
                    bytes = output.output_size_bytes,
                    attempt,
                    "Converted"
                );
                return ConversionResult::succeeded(
                    &task.display_name,
                    output.output_path,
                    attempt,
                    start.elapsed().as_millis() as u64,
                );
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                metrics::CONVERSION_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                metrics::CONVERSION_RETRIES.inc();
                warn!(file = %task.display_name, attempt, error = %e, "Conversion failed, retrying");
                tokio::time::sleep(Duration::from_millis(retry.delay_ms)).await;
            }
            Err(e) => {
                metrics::CONVERSION_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                let failure = match e {
                    ConverterError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
                    _ => FailureKind::Transcode,
                };
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&[failure.as_str()])
                    .inc();
                warn!(file = %task.display_name, attempt, error = %e, "Conversion failed");
                if let Some(stderr) = e.stderr() {
                    debug!(file = %task.display_name, stderr, "Engine diagnostics");
                }
                return ConversionResult::failed(
                    &task.display_name,
                    failure,
                    e.to_string(),
                    attempt,
                    start.elapsed().as_millis() as u64,
                );
            }
        }
    }
}

/// Reports a finished file and bumps the completed counter.
async fn finish_file(
    progress: &Option<mpsc::Sender<BatchProgress>>,
    index: usize,
    result: &ConversionResult,
    completed: &AtomicUsize,
    total: usize,
) {
    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
    emit(
        progress,
        BatchProgress::FileFinished {
            index,
            file: result.input_file.clone(),
            success: result.success,
            completed: done,
            total,
        },
    )
    .await;
}

async fn emit(progress: &Option<mpsc::Sender<BatchProgress>>, event: BatchProgress) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConverter, MockPackager};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn inputs(dir: &Path, names: &[&str]) -> Vec<InputFile> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, b"source").unwrap();
                InputFile::new(path, *name)
            })
            .collect()
    }

    fn batch(
        config: BatchConfig,
        converter: MockConverter,
    ) -> BatchConverter<MockConverter, MockPackager> {
        BatchConverter::new(config, converter, MockPackager::new())
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_batches() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        let bc = batch(BatchConfig::default().with_max_files(2), converter.clone());

        let result = bc
            .convert_batch(&[], dir.path(), ConversionOptions::default())
            .await;
        assert!(matches!(result, Err(BatchError::EmptyBatch)));

        let files = inputs(dir.path(), &["a.wav", "b.wav", "c.wav"]);
        let result = bc
            .convert_batch(&files, &dir.path().join("out"), ConversionOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(BatchError::TooManyFiles { count: 3, max: 2 })
        ));
        assert_eq!(converter.conversion_count().await, 0);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_rejects_invalid_bitrate() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        let bc = batch(BatchConfig::default(), converter.clone());
        let files = inputs(dir.path(), &["a.wav"]);

        let result = bc
            .convert_batch(
                &files,
                dir.path(),
                ConversionOptions::default().with_bitrate(1000),
            )
            .await;
        assert!(matches!(
            result,
            Err(BatchError::InvalidBitrate {
                bitrate_kbps: 1000,
                ..
            })
        ));
        assert_eq!(converter.conversion_count().await, 0);
    }

    #[tokio::test]
    async fn test_single_success_is_delivered_directly() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let files = inputs(dir.path(), &["song.wav"]);
        let bc = batch(BatchConfig::default(), MockConverter::new());

        let outcome = bc
            .convert_batch(&files, &out, ConversionOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.kind, OutcomeKind::Single);
        assert_eq!(outcome.delivered_path, out.join("song.mp3"));
        assert!(outcome.delivered_path.exists());
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results[0].success);
        assert_eq!(outcome.results[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_dispatch_follows_priority_and_results_follow_input() {
        let dir = TempDir::new().unwrap();
        let files = inputs(dir.path(), &["c.ogg", "a.flac", "b.wav", "d.m4a"]);
        let converter = MockConverter::new();
        let bc = batch(BatchConfig::default().with_max_parallel(1), converter.clone());

        let outcome = bc
            .convert_batch(&files, &dir.path().join("out"), ConversionOptions::default())
            .await
            .unwrap();

        let dispatched = converter.converted_inputs().await;
        assert_eq!(dispatched, vec!["b.wav", "a.flac", "d.m4a", "c.ogg"]);

        let names: Vec<&str> = outcome.results.iter().map(|r| r.input_file.as_str()).collect();
        assert_eq!(names, vec!["c.ogg", "a.flac", "b.wav", "d.m4a"]);
        assert_eq!(outcome.kind, OutcomeKind::Archive);
    }

    #[tokio::test]
    async fn test_unsupported_never_reaches_engine() {
        let dir = TempDir::new().unwrap();
        let files = inputs(dir.path(), &["a.wav", "notes.txt"]);
        let converter = MockConverter::new();
        let bc = batch(BatchConfig::default(), converter.clone());

        let outcome = bc
            .convert_batch(&files, &dir.path().join("out"), ConversionOptions::default())
            .await
            .unwrap();

        assert_eq!(converter.conversion_count().await, 1);
        assert_eq!(outcome.kind, OutcomeKind::Single);
        assert_eq!(
            outcome.results[1].failure,
            Some(FailureKind::UnsupportedFormat)
        );
        assert_eq!(outcome.results[1].attempts, 0);
    }

    #[tokio::test]
    async fn test_retries_only_retryable_errors() {
        let dir = TempDir::new().unwrap();
        let files = inputs(dir.path(), &["flaky.wav", "broken.wav"]);
        let converter = MockConverter::new();
        converter
            .push_error("flaky.wav", ConverterError::Timeout { timeout_secs: 1 })
            .await;
        converter.fail_file("broken.wav", "bad data").await;

        let bc = batch(BatchConfig::default().with_retry(3, 0), converter.clone());
        let outcome = bc
            .convert_batch(&files, &dir.path().join("out"), ConversionOptions::default())
            .await
            .unwrap();

        assert!(outcome.results[0].success);
        assert_eq!(outcome.results[0].attempts, 2);
        assert!(!outcome.results[1].success);
        assert_eq!(outcome.results[1].attempts, 1);
        assert_eq!(outcome.results[1].failure, Some(FailureKind::Transcode));
        assert_eq!(converter.conversion_count().await, 3);
    }

    #[tokio::test]
    async fn test_cancelled_batch_records_every_file() {
        let dir = TempDir::new().unwrap();
        let files = inputs(dir.path(), &["a.wav", "b.wav", "c.wav"]);
        let converter = MockConverter::new();
        let bc = batch(BatchConfig::default(), converter.clone());

        let token = CancellationToken::new();
        token.cancel();

        let result = bc
            .convert_batch(
                &files,
                &dir.path().join("out"),
                ConversionOptions::default().with_cancel(token),
            )
            .await;

        let Err(BatchError::NoSuccessfulConversions { results }) = result else {
            panic!("expected no successful conversions");
        };
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| r.failure == Some(FailureKind::Cancelled)));
        assert_eq!(converter.conversion_count().await, 0);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let dir = TempDir::new().unwrap();
        let files = inputs(dir.path(), &["a.wav", "b.flac"]);
        let converter = MockConverter::new().with_progress_steps(vec![10.0, 50.0, 40.0, 100.0]);
        let bc = batch(BatchConfig::default(), converter);

        let (tx, mut rx) = mpsc::channel(256);
        let outcome = bc
            .convert_batch(
                &files,
                &dir.path().join("out"),
                ConversionOptions::default().with_progress(tx),
            )
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(BatchProgress::Started { total_files: 2, .. })));
        assert!(matches!(
            events.last(),
            Some(BatchProgress::Completed { kind: OutcomeKind::Archive, succeeded: 2, failed: 0, .. })
        ));
        assert!(events.iter().any(|e| matches!(e, BatchProgress::Packaging { files: 2 })));

        let mut finished: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                BatchProgress::FileFinished { completed, .. } => Some(*completed),
                _ => None,
            })
            .collect();
        finished.sort();
        assert_eq!(finished, vec![1, 2]);

        for index in 0..2 {
            let percents: Vec<f32> = events
                .iter()
                .filter_map(|e| match e {
                    BatchProgress::FileProgress { index: i, percent, .. } if *i == index => {
                        Some(*percent)
                    }
                    _ => None,
                })
                .collect();
            assert!(percents.windows(2).all(|w| w[0] < w[1]));
            assert!(!percents.contains(&40.0));
        }
        assert_eq!(outcome.succeeded(), 2);
    }
}

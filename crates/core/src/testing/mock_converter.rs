//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::converter::{
    ConversionJob, ConversionOutput, ConversionProgress, Converter, ConverterError, MediaInfo,
};

/// Bytes every mock output starts with (an MPEG-1 Layer III frame header).
pub const MOCK_MP3_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Fail specific input files, permanently or a fixed number of times
/// - Simulate progress updates and conversion time
/// - Observe how many conversions ran at once
///
/// Successful conversions write deterministic bytes to the job's output
/// path, so repeated runs over the same inputs produce identical files.
///
/// # Example
///
/// ```rust,ignore
/// use mp3forge_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.fail_file("broken.wav", "corrupt header").await;
///
/// let output = converter.convert(job).await?;
///
/// let conversions = converter.recorded_conversions().await;
/// assert_eq!(conversions.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// One-shot errors per input file name, consumed in order.
    queued_errors: Arc<RwLock<HashMap<String, VecDeque<ConverterError>>>>,
    /// Input file names that always fail, with the failure reason.
    failing_files: Arc<RwLock<HashMap<String, String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration.
    delay: Duration,
    /// Percentages reported by `convert_with_progress`.
    progress_steps: Vec<f32>,
    /// Conversions currently running.
    active: Arc<AtomicUsize>,
    /// Highest number of conversions seen running at once.
    peak_active: Arc<AtomicUsize>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            queued_errors: Arc::new(RwLock::new(HashMap::new())),
            failing_files: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Duration::ZERO,
            progress_steps: vec![25.0, 50.0, 75.0, 100.0],
            active: Arc::new(AtomicUsize::new(0)),
            peak_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the simulated conversion duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the percentages reported during conversion.
    pub fn with_progress_steps(mut self, steps: Vec<f32>) -> Self {
        self.progress_steps = steps;
        self
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// File names of the submitted inputs, in submission order.
    pub async fn converted_inputs(&self) -> Vec<String> {
        self.conversions
            .read()
            .await
            .iter()
            .map(|c| file_name(&c.job.input_path))
            .collect()
    }

    /// Make every conversion of `file_name` fail with a transcode error.
    pub async fn fail_file(&self, file_name: impl Into<String>, reason: impl Into<String>) {
        self.failing_files
            .write()
            .await
            .insert(file_name.into(), reason.into());
    }

    /// Queue a one-shot error for the next conversion of `file_name`.
    pub async fn push_error(&self, file_name: impl Into<String>, error: ConverterError) {
        self.queued_errors
            .write()
            .await
            .entry(file_name.into())
            .or_default()
            .push_back(error);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Highest number of conversions observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    /// Bytes a successful conversion of `job` writes.
    pub fn expected_output(job: &ConversionJob) -> Vec<u8> {
        let mut bytes = MOCK_MP3_HEADER.to_vec();
        bytes.extend_from_slice(file_name(&job.input_path).as_bytes());
        bytes.extend_from_slice(format!(":{}k", job.bitrate_kbps).as_bytes());
        bytes
    }

    async fn take_error(&self, input: &str) -> Option<ConverterError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Some(err);
        }
        if let Some(err) = self
            .queued_errors
            .write()
            .await
            .get_mut(input)
            .and_then(|queue| queue.pop_front())
        {
            return Some(err);
        }
        self.failing_files
            .read()
            .await
            .get(input)
            .map(|reason| ConverterError::conversion_failed(reason.clone(), None))
    }

    async fn record(&self, job: &ConversionJob, success: bool) {
        self.conversions.write().await.push(RecordedConversion {
            job: job.clone(),
            success,
        });
    }

    async fn run(
        &self,
        job: ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionOutput, ConverterError> {
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(running, Ordering::SeqCst);
        let result = self.simulate(&job, progress_tx).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        self.record(&job, result.is_ok()).await;
        result
    }

    async fn simulate(
        &self,
        job: &ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionOutput, ConverterError> {
        let input = file_name(&job.input_path);

        let steps = self.progress_steps.len().max(1) as u32;
        let step_delay = self.delay / steps;
        match progress_tx {
            Some(tx) => {
                for (i, percent) in self.progress_steps.iter().enumerate() {
                    let _ = tx
                        .send(ConversionProgress {
                            job_id: job.job_id.clone(),
                            percent: *percent,
                            time_secs: i as f64,
                            duration_secs: Some(steps as f64),
                            speed: Some("10x".to_string()),
                        })
                        .await;
                    tokio::time::sleep(step_delay).await;
                }
            }
            None => tokio::time::sleep(self.delay).await,
        }

        if let Some(err) = self.take_error(&input).await {
            return Err(err);
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = Self::expected_output(job);
        tokio::fs::write(&job.output_path, &bytes).await?;

        Ok(ConversionOutput {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: bytes.len() as u64,
            duration_ms: self.delay.as_millis() as u64,
            input_format: job
                .input_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_lowercase(),
            bitrate_kbps: job.bitrate_kbps,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_lowercase();

        Ok(MediaInfo {
            path: PathBuf::from(path),
            size_bytes: 10 * 1024 * 1024,
            duration_secs: 180.0,
            format,
            audio_codec: Some("pcm_s16le".to_string()),
            audio_bitrate_kbps: Some(1411),
            audio_sample_rate: Some(44100),
            audio_channels: Some(2),
        })
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionOutput, ConverterError> {
        self.run(job, None).await
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionOutput, ConverterError> {
        self.run(job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        Ok(())
    }
}

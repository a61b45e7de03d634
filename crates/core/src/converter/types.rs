//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::ConverterError;

/// Default MP3 bitrate in kbps.
pub const DEFAULT_BITRATE_KBPS: u32 = 320;

/// Lowest bitrate accepted by the MP3 encoder.
pub const MIN_BITRATE_KBPS: u32 = 8;

/// Highest bitrate accepted by the MP3 encoder.
pub const MAX_BITRATE_KBPS: u32 = 320;

/// Worst (highest) LAME quality value.
pub const MAX_QUALITY: u8 = 9;

/// Checks that a bitrate is within the encoder's range.
pub fn validate_bitrate(bitrate_kbps: u32) -> Result<(), ConverterError> {
    if (MIN_BITRATE_KBPS..=MAX_BITRATE_KBPS).contains(&bitrate_kbps) {
        Ok(())
    } else {
        Err(ConverterError::InvalidBitrate { bitrate_kbps })
    }
}

/// A single-file MP3 transcode request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Unique job ID (batch id + input index).
    pub job_id: String,
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path.
    pub output_path: PathBuf,
    /// Target bitrate in kbps.
    pub bitrate_kbps: u32,
    /// LAME quality hint (0 = best, 9 = fastest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Name the source is known by, when the input path lacks its extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl ConversionJob {
    /// Creates a job at the default bitrate.
    pub fn new(
        job_id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            quality: None,
            source_name: None,
        }
    }

    /// Sets the target bitrate.
    pub fn with_bitrate(mut self, bitrate_kbps: u32) -> Self {
        self.bitrate_kbps = bitrate_kbps;
        self
    }

    /// Sets the quality hint.
    pub fn with_quality(mut self, quality: Option<u8>) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the name used for format detection.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Name format detection runs on: the source name, else the input path.
    pub fn detection_name(&self) -> String {
        match &self.source_name {
            Some(name) => name.clone(),
            None => self.input_path.to_string_lossy().to_string(),
        }
    }

    /// Path the engine writes to before the output is committed.
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self
            .output_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        self.output_path.with_file_name(name)
    }
}

/// Result of a successful transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Job ID.
    pub job_id: String,
    /// Output file path.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Conversion duration in milliseconds.
    pub duration_ms: u64,
    /// Detected input format.
    pub input_format: String,
    /// Bitrate the output was encoded at.
    pub bitrate_kbps: u32,
}

/// Information about an audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// File path.
    pub path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Container format (e.g., "flac", "wav").
    pub format: String,
    /// Audio codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Audio bitrate in kbps (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate_kbps: Option<u32>,
    /// Audio sample rate (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<u32>,
    /// Audio channels (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u8>,
}

/// Progress update during conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Job ID.
    pub job_id: String,
    /// Progress percentage (0.0 - 100.0).
    pub percent: f32,
    /// Current processing time in seconds.
    pub time_secs: f64,
    /// Total input duration in seconds, when known.
    pub duration_secs: Option<f64>,
    /// Current processing speed (e.g., "1.5x").
    pub speed: Option<String>,
}

/// Keeps reported progress within 0-100 and never moving backwards.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last: f32,
}

impl ProgressTracker {
    /// Creates a tracker starting at 0%.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a raw reading into the tracker and returns the value to report.
    ///
    /// NaN readings are ignored.
    pub fn advance(&mut self, raw: f32) -> f32 {
        if raw.is_finite() {
            self.last = raw.clamp(0.0, 100.0).max(self.last);
        } else if raw == f32::INFINITY {
            self.last = 100.0;
        }
        self.last
    }

    /// The last value reported.
    pub fn current(&self) -> f32 {
        self.last
    }
}

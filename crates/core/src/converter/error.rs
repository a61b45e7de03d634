//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a single-file transcode.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    EngineNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    ProbeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Input file extension is not a supported source format.
    #[error("Unsupported input format: {extension:?}")]
    UnsupportedFormat { extension: String },

    /// Bitrate outside the encoder's range.
    #[error("Invalid bitrate: {bitrate_kbps} kbps")]
    InvalidBitrate { bitrate_kbps: u32 },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// The engine reported a failure.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }

    /// Engine stderr captured for this failure, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ConversionFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ConverterError::Timeout { timeout_secs: 5 }.is_retryable());
        assert!(ConverterError::Io(std::io::Error::other("disk")).is_retryable());
        assert!(!ConverterError::unsupported("txt").is_retryable());
        assert!(!ConverterError::conversion_failed("bad input", None).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = ConverterError::unsupported("txt");
        assert_eq!(err.to_string(), "Unsupported input format: \"txt\"");

        let err = ConverterError::conversion_failed("exit 1", Some("Invalid data".to_string()));
        assert_eq!(err.to_string(), "Conversion failed: exit 1");
        assert_eq!(err.stderr(), Some("Invalid data"));
    }
}

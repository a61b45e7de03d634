//! Error types for the batch module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::ConversionResult;
use crate::archive::ArchiveError;

/// Errors that abort a whole batch.
///
/// Per-file failures never show up here; they are recorded in the
/// batch's `ConversionResult`s.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch contained no files.
    #[error("No input files")]
    EmptyBatch,

    /// The batch exceeds the configured ceiling.
    #[error("Too many files: {count} (maximum {max})")]
    TooManyFiles { count: usize, max: usize },

    /// The requested bitrate is outside the encoder's range.
    #[error("Invalid bitrate: {bitrate_kbps} kbps (expected {min}-{max})")]
    InvalidBitrate { bitrate_kbps: u32, min: u32, max: u32 },

    /// The output directory could not be created.
    #[error("Failed to prepare output directory: {path}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every file failed.
    #[error("No files were converted successfully ({} failed)", .results.len())]
    NoSuccessfulConversions { results: Vec<ConversionResult> },

    /// Conversions succeeded but the archive could not be built.
    ///
    /// The converted files are left on disk.
    #[error("Packaging failed after {succeeded} successful conversions: {source}")]
    Packaging {
        #[source]
        source: ArchiveError,
        succeeded: usize,
        results: Vec<ConversionResult>,
    },
}

impl BatchError {
    /// Per-file results, for the failures that happen after conversion.
    pub fn results(&self) -> Option<&[ConversionResult]> {
        match self {
            Self::NoSuccessfulConversions { results } | Self::Packaging { results, .. } => {
                Some(results)
            }
            _ => None,
        }
    }

    /// Whether the batch was refused before any file was touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::EmptyBatch | Self::TooManyFiles { .. } | Self::InvalidBitrate { .. }
        )
    }

    /// Process exit code for command-line callers.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoSuccessfulConversions { .. } => 2,
            Self::Packaging { .. } => 3,
            _ => 1,
        }
    }

    /// Short label, used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::EmptyBatch | Self::TooManyFiles { .. } | Self::InvalidBitrate { .. } => {
                "rejected"
            }
            Self::OutputDirectory { .. } => "output_directory",
            Self::NoSuccessfulConversions { .. } => "no_success",
            Self::Packaging { .. } => "packaging_failed",
        }
    }
}

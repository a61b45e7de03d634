//! Batch module for converting many files in one request.
//!
//! `BatchConverter` validates the batch, assigns collision-free output names,
//! dispatches files by format priority onto a bounded worker pool, and
//! delivers either the single MP3 produced or an archive of all of them.
//!
//! # Example
//!
//! ```ignore
//! use mp3forge_core::batch::{BatchConfig, BatchConverter, ConversionOptions, InputFile};
//! use mp3forge_core::{FfmpegConverter, ZipPackager};
//!
//! let batch = BatchConverter::new(
//!     BatchConfig::default(),
//!     FfmpegConverter::with_defaults(),
//!     ZipPackager::with_defaults(),
//! );
//!
//! let files = vec![InputFile::from_path("/music/a.wav"), InputFile::from_path("/music/b.flac")];
//! let outcome = batch
//!     .convert_batch(&files, Path::new("/tmp/out"), ConversionOptions::default())
//!     .await?;
//! println!("Deliver {}", outcome.delivered_path.display());
//! ```

mod config;
mod error;
mod orchestrator;
mod types;

pub use config::{BatchConfig, RetryConfig};
pub use error::BatchError;
pub use orchestrator::BatchConverter;
pub use types::{
    sort_by_priority, BatchOutcome, BatchProgress, ConversionOptions, ConversionResult,
    FailureKind, InputFile, OutcomeKind,
};

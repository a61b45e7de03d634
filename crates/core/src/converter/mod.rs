//! Converter module for transcoding audio files to MP3.
//!
//! This module provides the `Converter` trait and an FFmpeg implementation
//! that drives the `libmp3lame` encoder for a single file at a time.
//!
//! # Features
//!
//! - Input re-validation against the supported source formats
//! - Target bitrate and optional LAME quality hint
//! - Monotonic progress reporting during conversion
//! - Output committed only on success (written to a `.part` file first)
//!
//! # Example
//!
//! ```ignore
//! use mp3forge_core::converter::{Converter, ConversionJob, ConverterConfig, FfmpegConverter};
//!
//! let converter = FfmpegConverter::new(ConverterConfig::with_paths(ffmpeg, ffprobe));
//!
//! // Validate ffmpeg is available
//! converter.validate().await?;
//!
//! let job = ConversionJob::new("job-1", "/staging/take.flac", "/out/take.mp3")
//!     .with_bitrate(320);
//!
//! let output = converter.convert(job).await?;
//! println!("Converted in {} ms", output.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{
    validate_bitrate, ConversionJob, ConversionOutput, ConversionProgress, MediaInfo,
    ProgressTracker, DEFAULT_BITRATE_KBPS, MAX_BITRATE_KBPS, MAX_QUALITY, MIN_BITRATE_KBPS,
};

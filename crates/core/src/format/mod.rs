//! Format classification for batch inputs.
//!
//! Decides whether a file name carries a supported source extension, assigns
//! the processing priority used to order a batch, and derives the `.mp3`
//! output name for each input.
//!
//! # Example
//!
//! ```ignore
//! use mp3forge_core::format::{classify, output_file_name};
//!
//! let class = classify("Track 01.FLAC");
//! assert!(class.supported);
//! assert_eq!(class.extension, "flac");
//! assert_eq!(class.priority, 3);
//!
//! assert_eq!(output_file_name("Track 01.FLAC"), "Track 01.mp3");
//! ```

mod classify;
mod naming;

pub use classify::{classify, priority_order, FormatClass, SourceFormat, UNKNOWN_PRIORITY};
pub use naming::{assign_output_names, output_file_name, OUTPUT_EXTENSION};

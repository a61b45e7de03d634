//! Archive module for bundling converted files.
//!
//! Provides the `Packager` trait and a zip implementation. Each file is
//! stored under its base name and streamed through a bounded buffer, so the
//! archive can be built from outputs larger than available memory.
//!
//! # Example
//!
//! ```ignore
//! use mp3forge_core::archive::{Packager, ZipPackager};
//!
//! let packager = ZipPackager::with_defaults();
//! let summary = packager
//!     .package(&[out.join("a.mp3"), out.join("b.mp3")], &out.join("converted.zip"))
//!     .await?;
//! println!("{} entries, {} bytes", summary.entries.len(), summary.archive_bytes);
//! ```

mod config;
mod error;
mod traits;
mod types;
mod zip_packager;

pub use config::{ArchiveConfig, MAX_COMPRESSION_LEVEL};
pub use error::ArchiveError;
pub use traits::Packager;
pub use types::ArchiveSummary;
pub use zip_packager::ZipPackager;

//! Error types for the archive module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging converted files.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Nothing to package.
    #[error("No files to package")]
    NoFiles,

    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Source file exists but could not be read.
    #[error("Failed to read source file: {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive file could not be created or written.
    #[error("Failed to write archive: {path}")]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source path has no usable file name.
    #[error("Source path has no file name: {path}")]
    InvalidEntryName { path: PathBuf },

    /// Two sources share a base name.
    #[error("Duplicate archive entry: {name}")]
    DuplicateEntry { name: String },

    /// The zip encoder failed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The blocking packaging task did not complete.
    #[error("Packaging task failed: {reason}")]
    TaskFailed { reason: String },
}

impl ArchiveError {
    /// Creates a source unreadable error, mapping NotFound to `SourceNotFound`.
    pub fn source_unreadable(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::SourceNotFound { path }
        } else {
            Self::SourceUnreadable { path, source }
        }
    }

    /// Creates a destination unwritable error.
    pub fn destination_unwritable(path: PathBuf, source: std::io::Error) -> Self {
        Self::DestinationUnwritable { path, source }
    }
}

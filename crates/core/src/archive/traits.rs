//! Trait definitions for the archive module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::ArchiveError;
use super::types::ArchiveSummary;

/// Bundles files into a single container.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Returns the name of this packager implementation.
    fn name(&self) -> &str;

    /// Extension of the archives this packager produces (without the dot).
    fn extension(&self) -> &str;

    /// Writes every file in `files` into a new archive at `archive_path`.
    ///
    /// Entries are stored under their base names, in the given order.
    async fn package(
        &self,
        files: &[PathBuf],
        archive_path: &Path,
    ) -> Result<ArchiveSummary, ArchiveError>;
}

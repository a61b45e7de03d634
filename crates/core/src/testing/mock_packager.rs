//! Mock packager for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::archive::{ArchiveError, ArchiveSummary, Packager};

/// A recorded packaging call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPackage {
    /// Files handed to the packager, in order.
    pub files: Vec<PathBuf>,
    /// Requested archive path.
    pub archive_path: PathBuf,
    /// Whether packaging succeeded.
    pub success: bool,
}

/// Mock implementation of the Packager trait.
///
/// Writes a plain listing of the packaged file names to the archive path
/// instead of a real archive.
///
/// # Example
///
/// ```rust,ignore
/// use mp3forge_core::testing::MockPackager;
///
/// let packager = MockPackager::new();
/// packager.set_next_error(ArchiveError::NoFiles).await;
///
/// let packages = packager.recorded_packages().await;
/// assert_eq!(packages.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPackager {
    /// Recorded packaging calls.
    packages: Arc<RwLock<Vec<RecordedPackage>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ArchiveError>>>,
}

impl MockPackager {
    /// Create a new mock packager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded packaging calls.
    pub async fn recorded_packages(&self) -> Vec<RecordedPackage> {
        self.packages.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ArchiveError) {
        *self.next_error.write().await = Some(error);
    }

    async fn record(&self, files: &[PathBuf], archive_path: &Path, success: bool) {
        self.packages.write().await.push(RecordedPackage {
            files: files.to_vec(),
            archive_path: archive_path.to_path_buf(),
            success,
        });
    }
}

#[async_trait]
impl Packager for MockPackager {
    fn name(&self) -> &str {
        "mock"
    }

    fn extension(&self) -> &str {
        "zip"
    }

    async fn package(
        &self,
        files: &[PathBuf],
        archive_path: &Path,
    ) -> Result<ArchiveSummary, ArchiveError> {
        if let Some(err) = self.next_error.write().await.take() {
            self.record(files, archive_path, false).await;
            return Err(err);
        }

        let entries: Vec<String> = files
            .iter()
            .filter_map(|f| f.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        let listing = entries.join("\n");
        tokio::fs::write(archive_path, listing.as_bytes())
            .await
            .map_err(|e| ArchiveError::destination_unwritable(archive_path.to_path_buf(), e))?;

        self.record(files, archive_path, true).await;

        Ok(ArchiveSummary {
            archive_path: archive_path.to_path_buf(),
            entries,
            total_input_bytes: 0,
            archive_bytes: listing.len() as u64,
            duration_ms: 0,
        })
    }
}

//! Zip packager implementation.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::config::ArchiveConfig;
use super::error::ArchiveError;
use super::traits::Packager;
use super::types::ArchiveSummary;

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Packages files into a Deflate-compressed zip archive.
pub struct ZipPackager {
    config: ArchiveConfig,
}

impl ZipPackager {
    /// Creates a new zip packager with the given configuration.
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    /// Creates a packager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ArchiveConfig::default())
    }

    /// Resolves entry names and rejects duplicates before any I/O.
    fn entry_names(files: &[PathBuf]) -> Result<Vec<String>, ArchiveError> {
        let mut seen = HashSet::with_capacity(files.len());
        let mut names = Vec::with_capacity(files.len());

        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| ArchiveError::InvalidEntryName { path: path.clone() })?;

            if !seen.insert(name.clone()) {
                return Err(ArchiveError::DuplicateEntry { name });
            }
            names.push(name);
        }

        Ok(names)
    }

    /// Writes the archive. Runs on a blocking thread.
    fn write_archive(
        config: &ArchiveConfig,
        files: &[PathBuf],
        names: &[String],
        archive_path: &Path,
    ) -> Result<u64, ArchiveError> {
        let dest = File::create(archive_path)
            .map_err(|e| ArchiveError::destination_unwritable(archive_path.to_path_buf(), e))?;
        let mut zip = ZipWriter::new(BufWriter::with_capacity(config.buffer_size, dest));

        let base_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(config.compression_level))
            .unix_permissions(0o644);

        let mut total_input_bytes = 0u64;

        for (path, name) in files.iter().zip(names) {
            let source = File::open(path)
                .map_err(|e| ArchiveError::source_unreadable(path.clone(), e))?;
            let size = source
                .metadata()
                .map_err(|e| ArchiveError::source_unreadable(path.clone(), e))?
                .len();

            let options = base_options.large_file(size >= ZIP64_THRESHOLD);
            zip.start_file(name.as_str(), options)?;

            // Streamed through a bounded buffer, never held whole
            let mut reader = BufReader::with_capacity(config.buffer_size, source);
            std::io::copy(&mut reader, &mut zip)
                .map_err(|e| ArchiveError::source_unreadable(path.clone(), e))?;

            total_input_bytes += size;
            debug!(entry = %name, size, "Added archive entry");
        }

        let mut writer = zip.finish()?;
        writer
            .flush()
            .map_err(|e| ArchiveError::destination_unwritable(archive_path.to_path_buf(), e))?;

        Ok(total_input_bytes)
    }
}

#[async_trait]
impl Packager for ZipPackager {
    fn name(&self) -> &str {
        "zip"
    }

    fn extension(&self) -> &str {
        "zip"
    }

    async fn package(
        &self,
        files: &[PathBuf],
        archive_path: &Path,
    ) -> Result<ArchiveSummary, ArchiveError> {
        if files.is_empty() {
            return Err(ArchiveError::NoFiles);
        }

        let start = Instant::now();
        let names = Self::entry_names(files)?;

        let config = self.config.clone();
        let files = files.to_vec();
        let target = archive_path.to_path_buf();
        let task_names = names.clone();

        let result = tokio::task::spawn_blocking(move || {
            let result = Self::write_archive(&config, &files, &task_names, &target);
            if result.is_err() {
                // A half-written archive must not look like a finished one
                if let Err(e) = std::fs::remove_file(&target) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %target.display(), error = %e, "Failed to remove partial archive");
                    }
                }
            }
            result
        })
        .await
        .map_err(|e| ArchiveError::TaskFailed {
            reason: e.to_string(),
        })?;

        let total_input_bytes = result?;

        let archive_bytes = tokio::fs::metadata(archive_path)
            .await
            .map_err(|e| ArchiveError::destination_unwritable(archive_path.to_path_buf(), e))?
            .len();

        Ok(ArchiveSummary {
            archive_path: archive_path.to_path_buf(),
            entries: names,
            total_input_bytes,
            archive_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

//! Types for the archive module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of a produced archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// Path of the written archive.
    pub archive_path: PathBuf,
    /// Entry names, in the order they were written.
    pub entries: Vec<String>,
    /// Sum of the source file sizes.
    pub total_input_bytes: u64,
    /// Size of the finished archive.
    pub archive_bytes: u64,
    /// Time spent packaging in milliseconds.
    pub duration_ms: u64,
}

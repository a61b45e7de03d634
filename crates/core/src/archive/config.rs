//! Configuration for the archive module.

use serde::{Deserialize, Serialize};

/// Highest Deflate compression level.
pub const MAX_COMPRESSION_LEVEL: i64 = 9;

/// Configuration for the zip packager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Deflate compression level (0-9).
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,

    /// Buffer size for streaming each file into the archive, in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_compression_level() -> i64 {
    MAX_COMPRESSION_LEVEL
}

fn default_buffer_size() -> usize {
    256 * 1024 // 256 KiB
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl ArchiveConfig {
    /// Sets the compression level.
    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level;
        self
    }

    /// Sets the streaming buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

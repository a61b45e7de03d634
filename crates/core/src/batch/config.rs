//! Configuration for the batch module.

use serde::{Deserialize, Serialize};

/// Configuration for batch conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Largest number of files accepted in one batch.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum parallel transcodes across all batches of one converter.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_conversions: usize,

    /// File name prefix for produced archives.
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,

    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration for retryable transcode failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total engine attempts per file, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,
}

fn default_max_files() -> usize {
    20
}

fn default_max_parallel() -> usize {
    // ffmpeg is CPU bound; more workers than this only thrash
    num_cpus::get().clamp(1, 4)
}

fn default_archive_prefix() -> String {
    "converted-files".to_string()
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_parallel_conversions: default_max_parallel(),
            archive_prefix: default_archive_prefix(),
            retry: RetryConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Sets the batch size ceiling.
    pub fn with_max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    /// Sets the maximum parallel conversions.
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel_conversions = max;
        self
    }

    /// Sets the archive name prefix.
    pub fn with_archive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.archive_prefix = prefix.into();
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, max_attempts: u32, delay_ms: u64) -> Self {
        self.retry = RetryConfig {
            max_attempts,
            delay_ms,
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BatchConfig::default();
        assert_eq!(config.max_files, 20);
        assert!((1..=4).contains(&config.max_parallel_conversions));
        assert_eq!(config.archive_prefix, "converted-files");
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_config_builder() {
        let config = BatchConfig::default()
            .with_max_files(10)
            .with_max_parallel(1)
            .with_archive_prefix("mp3s")
            .with_retry(3, 0);

        assert_eq!(config.max_files, 10);
        assert_eq!(config.max_parallel_conversions, 1);
        assert_eq!(config.archive_prefix, "mp3s");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_ms, 0);
    }
}

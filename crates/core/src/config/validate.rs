use super::{types::Config, ConfigError};
use crate::archive::MAX_COMPRESSION_LEVEL;
use crate::converter::{validate_bitrate, MAX_QUALITY};

/// Validate configuration
/// Currently validates:
/// - Default bitrate is within the encoder's range
/// - Quality hint is at most 9
/// - Batch limits and worker count are not 0
/// - Compression level is within 0-9
/// - Engine timeout is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_bitrate(config.output.bitrate_kbps)
        .map_err(|e| ConfigError::ValidationError(format!("output.bitrate_kbps: {}", e)))?;

    if config.output.quality.is_some_and(|q| q > MAX_QUALITY) {
        return Err(ConfigError::ValidationError(format!(
            "output.quality must be at most {}",
            MAX_QUALITY
        )));
    }

    if config.batch.max_files == 0 {
        return Err(ConfigError::ValidationError(
            "batch.max_files cannot be 0".to_string(),
        ));
    }

    if config.batch.max_parallel_conversions == 0 {
        return Err(ConfigError::ValidationError(
            "batch.max_parallel_conversions cannot be 0".to_string(),
        ));
    }

    if config.batch.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "batch.retry.max_attempts cannot be 0".to_string(),
        ));
    }

    if config.batch.archive_prefix.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "batch.archive_prefix cannot be empty".to_string(),
        ));
    }

    if !(0..=MAX_COMPRESSION_LEVEL).contains(&config.archive.compression_level) {
        return Err(ConfigError::ValidationError(format!(
            "archive.compression_level must be between 0 and {}",
            MAX_COMPRESSION_LEVEL
        )));
    }

    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

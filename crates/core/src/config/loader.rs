use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `MP3FORGE_BATCH__MAX_FILES=10`
pub const ENV_PREFIX: &str = "MP3FORGE_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load built-in defaults with environment variable overrides
pub fn load_default_config() -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.output.bitrate_kbps, 320);
        assert_eq!(config.batch.max_files, 20);
        assert_eq!(config.archive.compression_level, 9);
        assert_eq!(config.converter.ffmpeg_path.to_str(), Some("ffmpeg"));
    }

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[output]
bitrate_kbps = 192
quality = 2

[batch]
max_parallel_conversions = 2
archive_prefix = "mp3s"

[batch.retry]
max_attempts = 3
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.output.bitrate_kbps, 192);
        assert_eq!(config.output.quality, Some(2));
        assert_eq!(config.batch.max_parallel_conversions, 2);
        assert_eq!(config.batch.archive_prefix, "mp3s");
        assert_eq!(config.batch.retry.max_attempts, 3);
        assert_eq!(config.batch.max_files, 20);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[batch]
max_files = "many"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/mp3forge.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[converter]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
timeout_secs = 600
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.converter.timeout_secs, 600);
        assert_eq!(
            config.converter.ffmpeg_path.to_str(),
            Some("/opt/ffmpeg/bin/ffmpeg")
        );
    }

    #[test]
    fn test_load_default_config() {
        let config = load_default_config().unwrap();
        assert_eq!(config.batch.archive_prefix, "converted-files");
        assert_eq!(config.output.bitrate_kbps, 320);
    }

    #[test]
    fn test_load_config_env_override() {
        let temp_file = NamedTempFile::new().unwrap();
        std::env::set_var("MP3FORGE_ARCHIVE__COMPRESSION_LEVEL", "4");
        let config = load_config(temp_file.path());
        std::env::remove_var("MP3FORGE_ARCHIVE__COMPRESSION_LEVEL");

        assert_eq!(config.unwrap().archive.compression_level, 4);
    }
}

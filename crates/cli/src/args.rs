//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

use mp3forge_core::Config;

/// Convert audio files (WAV, AIFF, FLAC, M4A, AAC, OGG) to MP3.
///
/// A single successful conversion is delivered as an MP3; several are
/// bundled into a zip archive in the output directory.
#[derive(Debug, Parser)]
#[command(name = "mp3forge")]
#[command(version)]
#[command(long_about = None)]
pub struct Args {
    /// Audio files to convert
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory for converted files and archives
    #[arg(short, long, env = "MP3FORGE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Target bitrate in kbps (8-320)
    #[arg(short, long)]
    pub bitrate: Option<u32>,

    /// LAME quality, 0 (best) to 9 (fastest)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub quality: Option<u8>,

    /// Maximum parallel conversions
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "MP3FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the per-file report as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Print Prometheus metrics to stderr after the batch
    #[arg(long)]
    pub metrics: bool,
}

impl Args {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(bitrate) = self.bitrate {
            config.output.bitrate_kbps = bitrate;
        }
        if let Some(quality) = self.quality {
            config.output.quality = Some(quality);
        }
        if let Some(jobs) = self.jobs {
            config.batch.max_parallel_conversions = jobs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_and_apply_overrides() {
        let args = Args::try_parse_from([
            "mp3forge", "-o", "/tmp/out", "-b", "192", "-q", "2", "-j", "1", "a.wav", "b.flac",
        ])
        .unwrap();
        assert_eq!(args.files.len(), 2);

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/out"));
        assert_eq!(config.output.bitrate_kbps, 192);
        assert_eq!(config.output.quality, Some(2));
        assert_eq!(config.batch.max_parallel_conversions, 1);
    }

    #[test]
    fn test_requires_files_and_bounds_quality() {
        assert!(Args::try_parse_from(["mp3forge"]).is_err());
        assert!(Args::try_parse_from(["mp3forge", "-q", "12", "a.wav"]).is_err());
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let args = Args::try_parse_from(["mp3forge", "a.wav"]).unwrap();
        let mut config = Config::default();
        let before = config.batch.max_parallel_conversions;
        args.apply(&mut config);
        assert_eq!(config.output.bitrate_kbps, 320);
        assert_eq!(config.batch.max_parallel_conversions, before);
    }
}

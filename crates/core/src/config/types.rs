use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::archive::ArchiveConfig;
use crate::batch::BatchConfig;
use crate::converter::{ConverterConfig, DEFAULT_BITRATE_KBPS};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Defaults for what a batch produces and where
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_bitrate")]
    pub bitrate_kbps: u32,
    #[serde(default)]
    pub quality: Option<u8>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            bitrate_kbps: default_bitrate(),
            quality: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("converted")
}

fn default_bitrate() -> u32 {
    DEFAULT_BITRATE_KBPS
}

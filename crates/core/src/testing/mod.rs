//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the engine and packaging
//! traits, allowing batch behavior to be tested without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use mp3forge_core::testing::{MockConverter, MockPackager};
//!
//! let converter = MockConverter::new();
//! converter.fail_file("broken.wav", "corrupt header").await;
//!
//! let batch = BatchConverter::new(BatchConfig::default(), converter.clone(), MockPackager::new());
//! ```

mod mock_converter;
mod mock_packager;

pub use mock_converter::{MockConverter, RecordedConversion, MOCK_MP3_HEADER};
pub use mock_packager::{MockPackager, RecordedPackage};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::batch::InputFile;

    /// Writes a small placeholder source file and returns it as an input.
    pub fn input_file(dir: &Path, name: &str) -> InputFile {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(&path, format!("source:{}", name)).ok();
        InputFile::new(path, name)
    }

    /// Writes one placeholder source per name.
    pub fn input_files(dir: &Path, names: &[&str]) -> Vec<InputFile> {
        names.iter().map(|name| input_file(dir, name)).collect()
    }

    /// Writes a canonical 16-bit stereo PCM WAV file containing silence.
    pub fn silent_wav(path: &Path, seconds: u32) -> PathBuf {
        const SAMPLE_RATE: u32 = 44_100;
        const CHANNELS: u16 = 2;
        const BLOCK_ALIGN: u16 = CHANNELS * 2;
        let data_len = SAMPLE_RATE * BLOCK_ALIGN as u32 * seconds;

        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&CHANNELS.to_le_bytes());
        bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        bytes.extend_from_slice(&(SAMPLE_RATE * BLOCK_ALIGN as u32).to_le_bytes());
        bytes.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);

        std::fs::write(path, bytes).ok();
        path.to_path_buf()
    }
}

//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionOutput, ConversionProgress, MediaInfo};
use crate::format::SourceFormat;

/// A transcoding engine that turns one audio file into an MP3.
///
/// Implementations must not retry; the batch layer owns retry policy.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError>;

    /// Converts a file as described by the job.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionOutput, ConverterError>;

    /// Converts a file with progress reporting.
    ///
    /// Reported percentages never decrease and never exceed 100. Updates may
    /// be dropped if the receiver is slow. If the receiver is dropped,
    /// conversion continues without progress reporting.
    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionOutput, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Returns the supported input extensions.
    fn supported_input_formats(&self) -> Vec<&'static str> {
        SourceFormat::all_extensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct StubConverter;

    #[async_trait]
    impl Converter for StubConverter {
        fn name(&self) -> &str {
            "stub"
        }

        async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
            Ok(MediaInfo {
                path: path.to_path_buf(),
                size_bytes: 1024,
                duration_secs: 180.0,
                format: "flac".to_string(),
                audio_codec: Some("flac".to_string()),
                audio_bitrate_kbps: Some(1411),
                audio_sample_rate: Some(44100),
                audio_channels: Some(2),
            })
        }

        async fn convert(&self, job: ConversionJob) -> Result<ConversionOutput, ConverterError> {
            Ok(ConversionOutput {
                job_id: job.job_id,
                output_path: job.output_path,
                output_size_bytes: 512,
                duration_ms: 1000,
                input_format: "flac".to_string(),
                bitrate_kbps: job.bitrate_kbps,
            })
        }

        async fn convert_with_progress(
            &self,
            job: ConversionJob,
            _progress_tx: mpsc::Sender<ConversionProgress>,
        ) -> Result<ConversionOutput, ConverterError> {
            self.convert(job).await
        }

        async fn validate(&self) -> Result<(), ConverterError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stub_converter_probe() {
        let converter = StubConverter;
        let info = converter.probe(Path::new("/test/file.flac")).await.unwrap();
        assert_eq!(info.format, "flac");
        assert_eq!(info.duration_secs, 180.0);
    }

    #[tokio::test]
    async fn test_stub_converter_convert() {
        let converter = StubConverter;
        let job = ConversionJob::new("test-job", "/test/input.flac", PathBuf::from("/test/output.mp3"))
            .with_bitrate(256);
        let output = converter.convert(job).await.unwrap();
        assert_eq!(output.job_id, "test-job");
        assert_eq!(output.bitrate_kbps, 256);
    }

    #[test]
    fn test_supported_formats() {
        let converter = StubConverter;
        let input_formats = converter.supported_input_formats();
        assert!(input_formats.contains(&"flac"));
        assert!(input_formats.contains(&"aiff"));
        assert!(!input_formats.contains(&"mp3"));
    }
}

//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{
    validate_bitrate, ConversionJob, ConversionOutput, ConversionProgress, MediaInfo,
    ProgressTracker, MAX_QUALITY,
};
use crate::format::classify;

/// MP3 encoder used for every transcode.
const MP3_CODEC: &str = "libmp3lame";

/// Number of trailing diagnostic lines kept from ffmpeg's stderr.
const MAX_STDERR_LINES: usize = 20;

/// One line of ffmpeg `-progress` output, classified.
#[derive(Debug, Clone, PartialEq)]
enum ProgressLine {
    /// Encoded media time, in seconds.
    Time(f64),
    /// Encoding speed relative to realtime (e.g. "12.3x").
    Speed(String),
    /// The engine finished writing.
    End,
    /// Some other `key=value` progress field.
    Other,
    /// Anything that is not progress output (warnings, errors).
    Diagnostic,
}

/// Parses the key=value stream ffmpeg writes for `-progress`.
struct ProgressParser {
    time_regex: Option<Regex>,
    speed_regex: Option<Regex>,
    key_regex: Option<Regex>,
}

impl ProgressParser {
    fn new() -> Self {
        Self {
            // out_time_ms is also in microseconds despite its name
            time_regex: Regex::new(r"^out_time_(?:us|ms)=(\d+)$").ok(),
            speed_regex: Regex::new(r"^speed=\s*(\d+(?:\.\d+)?)x$").ok(),
            key_regex: Regex::new(r"^[a-z0-9_:]+=").ok(),
        }
    }

    fn parse(&self, line: &str) -> ProgressLine {
        let line = line.trim();

        if line == "progress=end" {
            return ProgressLine::End;
        }

        if let Some(ref re) = self.time_regex {
            if let Some(us) = re
                .captures(line)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
            {
                return ProgressLine::Time(us / 1_000_000.0);
            }
        }

        if let Some(ref re) = self.speed_regex {
            if let Some(speed) = re.captures(line).and_then(|caps| caps.get(1)) {
                return ProgressLine::Speed(format!("{}x", speed.as_str()));
            }
        }

        match self.key_regex {
            Some(ref re) if re.is_match(line) => ProgressLine::Other,
            _ => ProgressLine::Diagnostic,
        }
    }
}

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Returns the converter configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Builds ffmpeg arguments for an MP3 transcode into `target`.
    fn build_args(&self, job: &ConversionJob, target: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite a stale partial file
            "-nostdin".to_string(),
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            // Drop embedded cover art and source tags
            "-vn".to_string(),
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-c:a".to_string(),
            MP3_CODEC.to_string(),
            "-b:a".to_string(),
            format!("{}k", job.bitrate_kbps),
        ];

        // LAME algorithm quality; -q:a would switch the encoder to VBR
        if let Some(quality) = job.quality {
            let level = quality.min(MAX_QUALITY).to_string();
            args.extend(["-compression_level".to_string(), level]);
        }

        // Stable bytes across runs of the same engine version
        args.extend([
            "-fflags".to_string(),
            "+bitexact".to_string(),
            "-flags:a".to_string(),
            "+bitexact".to_string(),
        ]);

        // The target carries a .part suffix, so the muxer must be explicit
        args.extend(["-f".to_string(), "mp3".to_string()]);

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(target.to_string_lossy().to_string());

        args
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, ConverterError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
            bit_rate: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            bit_rate: Option<String>,
            sample_rate: Option<String>,
            channels: Option<u8>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration_secs = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let size_bytes = probe
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

        let format_name = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown");

        // Some containers only report the bitrate at format level
        let bit_rate = audio_stream
            .and_then(|s| s.bit_rate.as_ref())
            .or(probe.format.bit_rate.as_ref())
            .and_then(|b| b.parse::<u32>().ok())
            .map(|b| b / 1000);

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
            format: format_name.to_string(),
            audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
            audio_bitrate_kbps: bit_rate,
            audio_sample_rate: audio_stream
                .and_then(|s| s.sample_rate.as_ref())
                .and_then(|r| r.parse::<u32>().ok()),
            audio_channels: audio_stream.and_then(|s| s.channels),
        })
    }

    /// Runs the conversion with optional progress reporting.
    async fn run_conversion(
        &self,
        job: &ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionOutput, ConverterError> {
        let start = Instant::now();

        // Re-validate independently of whatever the caller checked
        let class = classify(&job.detection_name());
        if !class.supported {
            return Err(ConverterError::unsupported(class.extension));
        }
        validate_bitrate(job.bitrate_kbps)?;

        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        // Ensure output directory exists
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                ConverterError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        // Input duration drives the percentage; conversion proceeds without it
        let input_info = match self.probe(&job.input_path).await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(job_id = %job.job_id, error = %e, "Probe failed, progress will be coarse");
                None
            }
        };
        let duration_secs = input_info
            .as_ref()
            .map(|i| i.duration_secs)
            .filter(|d| *d > 0.0);

        let partial_path = job.partial_path();
        let args = self.build_args(job, &partial_path);
        debug!(job_id = %job.job_id, ?args, "Spawning ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::EngineNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let Some(stderr) = child.stderr.take() else {
            let _ = child.kill().await;
            return Err(ConverterError::conversion_failed(
                "ffmpeg stderr was not captured",
                None,
            ));
        };
        let mut reader = BufReader::new(stderr).lines();
        let parser = ProgressParser::new();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let progress_interval = Duration::from_millis(self.config.progress_interval_ms);
        let result = timeout(timeout_duration, async {
            let mut tracker = ProgressTracker::new();
            let mut last_progress_send: Option<Instant> = None;
            let mut current_time = 0.0;
            let mut current_speed = None;
            let mut diagnostics: VecDeque<String> = VecDeque::new();

            while let Ok(Some(line)) = reader.next_line().await {
                let mut finished = false;
                match parser.parse(&line) {
                    ProgressLine::Time(secs) => current_time = secs,
                    ProgressLine::Speed(speed) => current_speed = Some(speed),
                    ProgressLine::End => finished = true,
                    ProgressLine::Other => {}
                    ProgressLine::Diagnostic => {
                        if !line.trim().is_empty() {
                            if diagnostics.len() == MAX_STDERR_LINES {
                                diagnostics.pop_front();
                            }
                            diagnostics.push_back(line);
                        }
                    }
                }

                let Some(ref tx) = progress_tx else {
                    continue;
                };

                let raw = if finished {
                    100.0
                } else if let Some(dur) = duration_secs {
                    (current_time / dur * 100.0) as f32
                } else {
                    0.0
                };

                let previous = tracker.current();
                let percent = tracker.advance(raw);
                let due = last_progress_send
                    .map(|t| t.elapsed() >= progress_interval)
                    .unwrap_or(true);

                if percent > previous && (due || finished) {
                    let progress = ConversionProgress {
                        job_id: job.job_id.clone(),
                        percent,
                        time_secs: current_time,
                        duration_secs,
                        speed: current_speed.clone(),
                    };

                    // Non-blocking send, dropped updates are acceptable
                    let _ = tx.try_send(progress);
                    last_progress_send = Some(Instant::now());
                }
            }

            let status = child.wait().await?;
            let diagnostics: Vec<String> = diagnostics.into_iter().collect();
            Ok::<(std::process::ExitStatus, String), std::io::Error>((
                status,
                diagnostics.join("\n"),
            ))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    discard_partial(&partial_path).await;
                    return Err(ConverterError::conversion_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                discard_partial(&partial_path).await;
                return Err(ConverterError::Io(e));
            }
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                discard_partial(&partial_path).await;
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        // An empty or missing file is not a conversion
        match tokio::fs::metadata(&partial_path).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                discard_partial(&partial_path).await;
                return Err(ConverterError::conversion_failed(
                    "Output file not created",
                    None,
                ));
            }
        }

        if let Err(e) = tokio::fs::rename(&partial_path, &job.output_path).await {
            discard_partial(&partial_path).await;
            return Err(ConverterError::Io(e));
        }

        let output_meta = tokio::fs::metadata(&job.output_path).await?;

        let input_format = input_info
            .map(|i| i.format)
            .unwrap_or(class.extension);

        Ok(ConversionOutput {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            input_format,
            bitrate_kbps: job.bitrate_kbps,
        })
    }
}

/// Removes a partially written output, logging anything but absence.
async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial output");
        }
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::ProbeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionOutput, ConverterError> {
        self.run_conversion(&job, None).await
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionOutput, ConverterError> {
        self.run_conversion(&job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::EngineNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::ProbeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn missing_engine() -> FfmpegConverter {
        FfmpegConverter::new(ConverterConfig::with_paths(
            PathBuf::from("/nonexistent/bin/ffmpeg"),
            PathBuf::from("/nonexistent/bin/ffprobe"),
        ))
    }

    #[test]
    fn test_build_args_mp3() {
        let converter = FfmpegConverter::with_defaults();
        let job = ConversionJob::new("b-0", "/input.flac", "/out/output.mp3").with_bitrate(192);

        let args = converter.build_args(&job, &job.partial_path());

        assert!(args.contains(&"-c:a".to_string()));
        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(args.contains(&"-b:a".to_string()));
        assert!(args.contains(&"192k".to_string()));
        assert!(!args.contains(&"-q:a".to_string()));
        assert_eq!(args.last().unwrap(), "/out/output.mp3.part");

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "mp3");
    }

    #[test]
    fn test_build_args_quality_is_clamped() {
        let converter = FfmpegConverter::with_defaults();
        let job = ConversionJob::new("b-0", "/a.wav", "/a.mp3").with_quality(Some(42));

        let args = converter.build_args(&job, Path::new("/a.mp3.part"));
        let q = args.iter().position(|a| a == "-compression_level").unwrap();
        assert_eq!(args[q + 1], "9");
    }

    #[test]
    fn test_build_args_quality_keeps_constant_bitrate() {
        let converter = FfmpegConverter::with_defaults();
        let job = ConversionJob::new("b-0", "/a.wav", "/a.mp3")
            .with_bitrate(128)
            .with_quality(Some(2));

        let args = converter.build_args(&job, Path::new("/a.mp3.part"));
        let b = args.iter().position(|a| a == "-b:a").unwrap();
        assert_eq!(args[b + 1], "128k");
        let q = args.iter().position(|a| a == "-compression_level").unwrap();
        assert_eq!(args[q + 1], "2");
        assert!(!args.contains(&"-q:a".to_string()));
    }

    #[test]
    fn test_build_args_extra_before_output() {
        let mut config = ConverterConfig::default();
        config.extra_ffmpeg_args = vec!["-threads".to_string(), "2".to_string()];
        let converter = FfmpegConverter::new(config);
        let job = ConversionJob::new("b-0", "/a.wav", "/a.mp3");

        let args = converter.build_args(&job, Path::new("/a.mp3.part"));
        let n = args.len();
        assert_eq!(args[n - 3], "-threads");
        assert_eq!(args[n - 2], "2");
    }

    #[test]
    fn test_progress_parser() {
        let parser = ProgressParser::new();
        assert_eq!(parser.parse("out_time_us=1500000"), ProgressLine::Time(1.5));
        assert_eq!(parser.parse("out_time_ms=2000000"), ProgressLine::Time(2.0));
        assert_eq!(
            parser.parse("speed=12.5x"),
            ProgressLine::Speed("12.5x".to_string())
        );
        assert_eq!(parser.parse("speed= 3x"), ProgressLine::Speed("3x".to_string()));
        assert_eq!(parser.parse("progress=end"), ProgressLine::End);
        assert_eq!(parser.parse("progress=continue"), ProgressLine::Other);
        assert_eq!(parser.parse("out_time_us=N/A"), ProgressLine::Other);
        assert_eq!(parser.parse("bitrate= 320.0kbits/s"), ProgressLine::Other);
        assert_eq!(
            parser.parse("[in#0 @ 0x55] Error opening input: Invalid data found"),
            ProgressLine::Diagnostic
        );
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "format": {
                "filename": "test.flac",
                "format_name": "flac",
                "duration": "180.5",
                "size": "30000000"
            },
            "streams": [
                {
                    "codec_type": "audio",
                    "codec_name": "flac",
                    "bit_rate": "1411000",
                    "sample_rate": "44100",
                    "channels": 2
                }
            ]
        }"#;

        let info = FfmpegConverter::parse_probe_output(Path::new("test.flac"), json).unwrap();
        assert_eq!(info.format, "flac");
        assert!((info.duration_secs - 180.5).abs() < 0.01);
        assert_eq!(info.size_bytes, 30000000);
        assert_eq!(info.audio_codec, Some("flac".to_string()));
        assert_eq!(info.audio_bitrate_kbps, Some(1411));
        assert_eq!(info.audio_sample_rate, Some(44100));
        assert_eq!(info.audio_channels, Some(2));
    }

    #[test]
    fn test_parse_probe_output_format_bitrate_fallback() {
        let json = r#"{
            "format": {
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": "12.0",
                "bit_rate": "256000"
            },
            "streams": [
                { "codec_type": "video", "codec_name": "mjpeg" },
                { "codec_type": "audio", "codec_name": "aac", "channels": 2 }
            ]
        }"#;

        let info = FfmpegConverter::parse_probe_output(Path::new("a.m4a"), json).unwrap();
        assert_eq!(info.format, "mov");
        assert_eq!(info.audio_codec, Some("aac".to_string()));
        assert_eq!(info.audio_bitrate_kbps, Some(256));
    }

    #[test]
    fn test_parse_probe_output_invalid() {
        let result = FfmpegConverter::parse_probe_output(Path::new("x.wav"), "not json");
        assert!(matches!(result, Err(ConverterError::ParseError { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_before_engine() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, b"hello").unwrap();

        let converter = missing_engine();
        let job = ConversionJob::new("b-0", &input, dir.path().join("notes.mp3"));

        // A missing engine would surface EngineNotFound if anything was spawned
        let result = converter.convert(job).await;
        assert!(matches!(
            result,
            Err(ConverterError::UnsupportedFormat { ref extension }) if extension == "txt"
        ));
    }

    #[tokio::test]
    async fn test_invalid_bitrate_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.wav");
        std::fs::write(&input, b"RIFF").unwrap();

        let job = ConversionJob::new("b-0", &input, dir.path().join("a.mp3")).with_bitrate(1000);
        let result = missing_engine().convert(job).await;
        assert!(matches!(
            result,
            Err(ConverterError::InvalidBitrate { bitrate_kbps: 1000 })
        ));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let job = ConversionJob::new("b-0", dir.path().join("gone.wav"), dir.path().join("gone.mp3"));

        let result = missing_engine().convert(job).await;
        assert!(matches!(result, Err(ConverterError::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_engine_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.wav");
        std::fs::write(&input, b"RIFF").unwrap();
        let output = dir.path().join("out").join("a.mp3");

        let job = ConversionJob::new("b-0", &input, &output);
        let partial = job.partial_path();
        let result = missing_engine().convert(job).await;

        assert!(matches!(result, Err(ConverterError::EngineNotFound { .. })));
        assert!(!output.exists());
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn test_validate_missing_engine() {
        let result = missing_engine().validate().await;
        assert!(matches!(result, Err(ConverterError::EngineNotFound { .. })));
    }
}

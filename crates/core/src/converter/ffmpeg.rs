//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::display::ProgressDisplay;
use super::error::TranscodeError;
use super::progress::{consume_progress, ProgressTracker};
use super::traits::Transcoder;
use super::types::{
    MediaDuration, MonitorState, RunOutcome, TranscodeJob, AUDIO_CHANNELS, AUDIO_CODEC,
    AUDIO_SAMPLE_RATE_HZ, PIXEL_FORMAT, VIDEO_CODEC,
};

/// Number of stderr lines kept for failure reports.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg-based transcoder producing SWF files.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    config: ConverterConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Builds ffmpeg arguments for a SWF transcode.
    ///
    /// Progress goes to stdout as `key=value` lines, human-readable stats
    /// are disabled, and an existing output file is overwritten.
    pub fn build_args(&self, job: &TranscodeJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
        ];

        // Video
        args.extend([
            "-c:v".to_string(),
            VIDEO_CODEC.to_string(),
            "-q:v".to_string(),
            job.params.clamped_quality().to_string(),
            "-r".to_string(),
            job.params.framerate.to_string(),
            "-pix_fmt".to_string(),
            PIXEL_FORMAT.to_string(),
        ]);

        // Audio
        args.extend([
            "-ar".to_string(),
            AUDIO_SAMPLE_RATE_HZ.to_string(),
            "-ac".to_string(),
            AUDIO_CHANNELS.to_string(),
            "-c:a".to_string(),
            AUDIO_CODEC.to_string(),
        ]);

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    /// Arguments asking ffprobe for the container duration only.
    fn probe_args(path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=nokey=1:noprint_wrappers=1".to_string(),
            path.to_string_lossy().to_string(),
        ]
    }

    fn advance(job: &TranscodeJob, state: &mut MonitorState, next: MonitorState) {
        debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
        if next.is_terminal() {
            info!(job_id = %job.job_id, from = %state, to = %next, "Transcode state change");
        } else {
            debug!(job_id = %job.job_id, from = %state, to = %next, "Transcode state change");
        }
        *state = next;
    }
}

/// Parses ffprobe's plain `format=duration` output.
///
/// Returns `None` for empty output, `N/A`, and negative or non-finite values.
pub fn parse_probe_duration(output: &str) -> MediaDuration {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    line.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

/// Drains a diagnostic stream, keeping only the last `limit` lines.
pub async fn collect_tail<R>(stream: R, limit: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut tail = VecDeque::with_capacity(limit);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                if line.is_empty() || limit == 0 {
                    continue;
                }
                if tail.len() == limit {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Err(e) => {
                debug!(error = %e, "Stopped reading encoder diagnostics");
                break;
            }
        }
    }

    tail.into()
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn resolve_duration(&self, path: &Path, hint: Option<f64>) -> MediaDuration {
        if let Some(secs) = hint.filter(|h| h.is_finite() && *h > 0.0) {
            debug!(path = %path.display(), secs, "Using known duration");
            return Some(secs);
        }

        let output = match Command::new(&self.config.ffprobe_path)
            .args(Self::probe_args(path))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!(
                    ffprobe = %self.config.ffprobe_path.display(),
                    error = %e,
                    "Duration probe could not run"
                );
                return None;
            }
        };

        if !output.status.success() {
            debug!(path = %path.display(), status = ?output.status.code(), "Duration probe failed");
            return None;
        }

        let duration = parse_probe_duration(&String::from_utf8_lossy(&output.stdout));
        match duration {
            Some(secs) => debug!(path = %path.display(), secs, "Probed duration"),
            None => debug!(path = %path.display(), "Probe returned no usable duration"),
        }
        duration
    }

    async fn run_transcode(
        &self,
        job: &TranscodeJob,
        duration: MediaDuration,
        display: &mut dyn ProgressDisplay,
    ) -> Result<RunOutcome, TranscodeError> {
        let mut state = MonitorState::Starting;
        let args = self.build_args(job);
        debug!(job_id = %job.job_id, ?args, "Launching encoder");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TranscodeError::from_spawn(&self.config.ffmpeg_path, e))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(TranscodeError::ProgressChannel);
        };
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_tail(stderr, STDERR_TAIL_LINES)));

        let started = Instant::now();
        Self::advance(job, &mut state, MonitorState::Streaming);
        info!(
            job_id = %job.job_id,
            input = %job.input_path.display(),
            output = %job.output_path.display(),
            duration_secs = ?duration,
            "Transcode started"
        );

        let mut tracker = ProgressTracker::new(duration);
        let streamed =
            consume_progress(BufReader::new(stdout), &mut tracker, display, started).await;

        if let Err(e) = display.finish() {
            debug!(error = %e, "Failed to terminate progress line");
        }

        if let Err(e) = streamed {
            // The encoder would block on a full pipe once nobody reads it.
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(TranscodeError::Io(e));
        }

        let status = child.wait().await?;
        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if status.success() {
            Self::advance(job, &mut state, MonitorState::Succeeded);
            info!(
                job_id = %job.job_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                converted_secs = tracker.converted_secs(),
                total_secs = ?tracker.total_secs(),
                "Transcode finished"
            );
            return Ok(RunOutcome::Success);
        }

        Self::advance(job, &mut state, MonitorState::Failed);
        warn!(
            job_id = %job.job_id,
            exit_code = ?status.code(),
            input = %job.input_path.display(),
            output = %job.output_path.display(),
            last_progress_ms = ?tracker
                .last_sample()
                .map(|sample| sample.elapsed.as_millis() as u64),
            "Encoder exited with failure"
        );

        Ok(RunOutcome::Failure {
            exit_code: status.code(),
            input_path: job.input_path.clone(),
            output_path: job.output_path.clone(),
            stderr_tail: if stderr_tail.is_empty() {
                None
            } else {
                Some(stderr_tail.join("\n"))
            },
        })
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        // Check ffmpeg exists
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        if let Err(e) = ffmpeg_result {
            return Err(TranscodeError::from_spawn(&self.config.ffmpeg_path, e));
        }

        // ffprobe is optional: without it durations are only known from hints.
        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        if let Err(e) = ffprobe_result {
            warn!(
                ffprobe = %self.config.ffprobe_path.display(),
                error = %e,
                "ffprobe unavailable, progress percentage needs a known duration"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::types::EncodingParams;
    use std::path::PathBuf;

    fn job(quality: u8) -> TranscodeJob {
        TranscodeJob {
            job_id: "job-1".to_string(),
            input_path: PathBuf::from("/videos/clip.mp4"),
            output_path: PathBuf::from("/videos/clip.swf"),
            params: EncodingParams {
                quality,
                framerate: 24,
            },
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_build_args() {
        let transcoder = FfmpegTranscoder::with_defaults();
        let args = transcoder.build_args(&job(5));

        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(value_after(&args, "-i"), Some("/videos/clip.mp4"));
        assert_eq!(value_after(&args, "-c:v"), Some("flv"));
        assert_eq!(value_after(&args, "-q:v"), Some("5"));
        assert_eq!(value_after(&args, "-r"), Some("24"));
        assert_eq!(value_after(&args, "-pix_fmt"), Some("yuv420p"));
        assert_eq!(value_after(&args, "-ar"), Some("44100"));
        assert_eq!(value_after(&args, "-ac"), Some("2"));
        assert_eq!(value_after(&args, "-c:a"), Some("libmp3lame"));
        assert_eq!(value_after(&args, "-progress"), Some("pipe:1"));
        assert_eq!(value_after(&args, "-loglevel"), Some("error"));
        assert!(args.contains(&"-nostats".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/videos/clip.swf"));
    }

    #[test]
    fn test_build_args_clamps_quality() {
        let transcoder = FfmpegTranscoder::with_defaults();
        assert_eq!(value_after(&transcoder.build_args(&job(0)), "-q:v"), Some("1"));
        assert_eq!(value_after(&transcoder.build_args(&job(64)), "-q:v"), Some("31"));
    }

    #[test]
    fn test_build_args_extra_before_output() {
        let config = ConverterConfig::default()
            .with_log_level("warning")
            .with_extra_args(["-threads", "2"]);
        let args = FfmpegTranscoder::new(config).build_args(&job(5));

        let n = args.len();
        assert_eq!(args[n - 3..], ["-threads", "2", "/videos/clip.swf"]);
        assert_eq!(value_after(&args, "-loglevel"), Some("warning"));
    }

    #[test]
    fn test_probe_args() {
        let args = FfmpegTranscoder::probe_args(Path::new("/videos/clip.mp4"));
        assert_eq!(value_after(&args, "-show_entries"), Some("format=duration"));
        assert_eq!(value_after(&args, "-of"), Some("default=nokey=1:noprint_wrappers=1"));
        assert_eq!(args.last().map(String::as_str), Some("/videos/clip.mp4"));
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("180.500000\n"), Some(180.5));
        assert_eq!(parse_probe_duration("\n  42\n"), Some(42.0));
        assert_eq!(parse_probe_duration("0.000000"), Some(0.0));
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration(""), None);
        assert_eq!(parse_probe_duration("-3.0"), None);
        assert_eq!(parse_probe_duration("nan"), None);
        assert_eq!(parse_probe_duration("inf"), None);
    }

    #[tokio::test]
    async fn test_collect_tail_keeps_last_lines() {
        let stream = tokio_test::io::Builder::new()
            .read(b"one\ntwo\n\nthree\nfo")
            .read(b"ur\n")
            .build();
        assert_eq!(collect_tail(stream, 2).await, vec!["three", "four"]);

        let stream = tokio_test::io::Builder::new().read(b"only\n").build();
        assert!(collect_tail(stream, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_duration_prefers_hint() {
        let config = ConverterConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        );
        let transcoder = FfmpegTranscoder::new(config);
        let path = Path::new("/videos/clip.mp4");

        assert_eq!(transcoder.resolve_duration(path, Some(12.5)).await, Some(12.5));
        // Unusable hints fall through to the (missing) probe.
        assert_eq!(transcoder.resolve_duration(path, Some(0.0)).await, None);
        assert_eq!(transcoder.resolve_duration(path, Some(-1.0)).await, None);
        assert_eq!(transcoder.resolve_duration(path, None).await, None);
    }

    #[tokio::test]
    async fn test_run_transcode_missing_encoder() {
        let config = ConverterConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        );
        let transcoder = FfmpegTranscoder::new(config);
        let mut display = crate::converter::TerminalDisplay::new(Vec::new(), 10);

        let err = transcoder
            .run_transcode(&job(5), Some(10.0), &mut display)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::EncoderNotFound { .. }));
        assert!(err.is_environment_error());
    }

    #[test]
    fn test_name() {
        assert_eq!(FfmpegTranscoder::with_defaults().name(), "ffmpeg");
    }

    #[tokio::test]
    async fn test_validate_missing_encoder() {
        let transcoder = FfmpegTranscoder::new(ConverterConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        ));
        let err = transcoder.validate().await.unwrap_err();
        assert!(matches!(err, TranscodeError::EncoderNotFound { .. }));
    }
}

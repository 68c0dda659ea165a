//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Total media duration in seconds, `None` when it could not be determined.
pub type MediaDuration = Option<f64>;

/// Best quantizer accepted by the FLV1 encoder.
pub const MIN_QUALITY: u8 = 1;
/// Worst quantizer accepted by the FLV1 encoder.
pub const MAX_QUALITY: u8 = 31;

/// Video codec used for SWF output (Sorenson Spark / FLV1).
pub const VIDEO_CODEC: &str = "flv";
/// Pixel format required by the FLV1 encoder.
pub const PIXEL_FORMAT: &str = "yuv420p";
/// Audio codec embedded in the SWF stream.
pub const AUDIO_CODEC: &str = "libmp3lame";
/// Audio sample rate in Hz.
pub const AUDIO_SAMPLE_RATE_HZ: u32 = 44_100;
/// Number of audio channels.
pub const AUDIO_CHANNELS: u8 = 2;

/// Encoding parameters for a SWF transcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingParams {
    /// Video quantizer, 1 (best) to 31 (worst).
    pub quality: u8,
    /// Output frame rate.
    pub framerate: u32,
}

impl EncodingParams {
    /// Creates parameters, clamping quality into the supported range.
    pub fn new(quality: u8, framerate: u32) -> Self {
        Self {
            quality: quality.clamp(MIN_QUALITY, MAX_QUALITY),
            framerate,
        }
    }

    /// Quality guaranteed to lie in `MIN_QUALITY..=MAX_QUALITY`, even for
    /// values built without [`EncodingParams::new`].
    pub fn clamped_quality(&self) -> u8 {
        self.quality.clamp(MIN_QUALITY, MAX_QUALITY)
    }
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            quality: 5,
            framerate: 30,
        }
    }
}

/// A single transcode request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeJob {
    /// Identifier used in logs.
    pub job_id: String,
    /// Source media file.
    pub input_path: PathBuf,
    /// Destination SWF file. Overwritten if it exists.
    pub output_path: PathBuf,
    /// Encoder settings.
    pub params: EncodingParams,
}

impl TranscodeJob {
    pub fn new(
        job_id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        params: EncodingParams,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            params,
        }
    }
}

/// Snapshot of conversion progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    /// Wall-clock time since the encoder was launched.
    pub elapsed: Duration,
    /// Media time converted so far, in seconds.
    pub converted_secs: f64,
}

/// A frame to be shown by a progress display.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressFrame {
    /// Total duration is known: percentage, bar and ETA are available.
    Known {
        sample: ProgressSample,
        total_secs: f64,
        /// Completed fraction in `[0, 1]`.
        fraction: f64,
        /// `floor(fraction * 100)`.
        percent: u8,
        /// Estimated seconds remaining.
        eta_secs: f64,
    },
    /// Total duration is unknown: only converted time can be shown.
    Unknown { sample: ProgressSample },
}

impl ProgressFrame {
    /// The sample this frame was built from.
    pub fn sample(&self) -> &ProgressSample {
        match self {
            Self::Known { sample, .. } | Self::Unknown { sample } => sample,
        }
    }

    /// Percentage, if the total duration is known.
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Known { percent, .. } => Some(*percent),
            Self::Unknown { .. } => None,
        }
    }
}

/// Terminal result of a transcode that was launched successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Encoder exited with status zero.
    Success,
    /// Encoder exited non-zero or was killed.
    Failure {
        /// Exit code, `None` if the encoder was terminated by a signal.
        exit_code: Option<i32>,
        input_path: PathBuf,
        output_path: PathBuf,
        /// Last diagnostic lines the encoder wrote to stderr.
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr_tail: Option<String>,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Encoder exit code: `Some(0)` on success, `None` when a failed
    /// encoder was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Success => Some(0),
            Self::Failure { exit_code, .. } => *exit_code,
        }
    }
}

/// Lifecycle of a single monitored transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Starting,
    Streaming,
    Succeeded,
    Failed,
}

impl MonitorState {
    /// Whether `next` is reachable from this state in one step.
    pub fn can_transition_to(self, next: MonitorState) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Streaming)
                | (Self::Streaming, Self::Streaming)
                | (Self::Streaming, Self::Succeeded)
                | (Self::Streaming, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Streaming => "streaming",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

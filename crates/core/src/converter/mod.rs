//! Converter module for transcoding media files to SWF.
//!
//! This module provides the `Transcoder` trait and an FFmpeg implementation
//! that launches the encoder, follows its `-progress` stream and renders a
//! live progress bar.
//!
//! # Features
//!
//! - Duration resolution from a hint or an ffprobe query
//! - SWF output (FLV1 video, MP3 audio)
//! - Progress bar with percentage and ETA, redrawn only when the percentage changes
//! - Elapsed-time display when the duration is unknown
//! - Structured failure reports with the encoder's exit code
//!
//! # Example
//!
//! ```ignore
//! use flashcast_core::converter::{
//!     EncodingParams, FfmpegTranscoder, TerminalDisplay, TranscodeJob, Transcoder,
//! };
//!
//! let transcoder = FfmpegTranscoder::with_defaults();
//! let duration = transcoder.resolve_duration(Path::new("clip.mp4"), None).await;
//!
//! let job = TranscodeJob::new("job-1", "clip.mp4", "clip.swf", EncodingParams::default());
//! let mut display = TerminalDisplay::stdout(50);
//!
//! match transcoder.run_transcode(&job, duration, &mut display).await? {
//!     RunOutcome::Success => println!("done"),
//!     RunOutcome::Failure { exit_code, .. } => eprintln!("ffmpeg exited with {:?}", exit_code),
//! }
//! ```

mod config;
mod display;
mod error;
mod ffmpeg;
mod progress;
mod time;
mod traits;
mod types;

pub use config::{ConverterConfig, FFMPEG_LOG_LEVELS};
pub use display::{format_frame, render_bar, ChannelDisplay, ProgressDisplay, TerminalDisplay};
pub use error::TranscodeError;
pub use ffmpeg::{collect_tail, parse_probe_duration, FfmpegTranscoder};
pub use progress::{consume_progress, parse_progress_line, ProgressTracker, ProgressUpdate};
pub use time::{format_time, UNKNOWN_TIME};
pub use traits::Transcoder;
pub use types::{
    EncodingParams, MediaDuration, MonitorState, ProgressFrame, ProgressSample, RunOutcome,
    TranscodeJob, AUDIO_CHANNELS, AUDIO_CODEC, AUDIO_SAMPLE_RATE_HZ, MAX_QUALITY, MIN_QUALITY,
    PIXEL_FORMAT, VIDEO_CODEC,
};

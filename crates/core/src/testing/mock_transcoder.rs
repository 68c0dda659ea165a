//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{
    MediaDuration, ProgressDisplay, ProgressTracker, RunOutcome, TranscodeError, TranscodeJob,
    Transcoder,
};

/// A recorded transcode for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    /// The job that was submitted.
    pub job: TranscodeJob,
    /// The duration the job was run with.
    pub duration: MediaDuration,
}

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Track transcode jobs for assertions
/// - Simulate success, encoder failure, or launch errors
/// - Control probe results
/// - Replay scripted progress lines through the real tracker
#[derive(Debug, Clone)]
pub struct MockTranscoder {
    /// Recorded transcodes.
    jobs: Arc<RwLock<Vec<RecordedTranscode>>>,
    /// Duration returned when no usable hint is given.
    probe_duration: Arc<RwLock<MediaDuration>>,
    /// Progress lines replayed during each run.
    progress_lines: Arc<RwLock<Vec<String>>>,
    /// Exit code to report; `Some(0)` means success.
    exit_code: Arc<RwLock<Option<i32>>>,
    /// If set, the next run or validation will fail with this error.
    next_error: Arc<RwLock<Option<TranscodeError>>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a new mock transcoder that succeeds with no probe result.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            probe_duration: Arc::new(RwLock::new(None)),
            progress_lines: Arc::new(RwLock::new(Vec::new())),
            exit_code: Arc::new(RwLock::new(Some(0))),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded transcodes.
    pub async fn recorded_jobs(&self) -> Vec<RecordedTranscode> {
        self.jobs.read().await.clone()
    }

    /// Set the duration returned by probing.
    pub async fn set_probe_duration(&self, duration: MediaDuration) {
        *self.probe_duration.write().await = duration;
    }

    /// Set the progress lines replayed by each run.
    pub async fn set_progress_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.progress_lines.write().await = lines.into_iter().map(Into::into).collect();
    }

    /// Make runs end as if the encoder exited with `code` (`None` = killed).
    pub async fn fail_with_exit_code(&self, code: Option<i32>) {
        *self.exit_code.write().await = code;
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TranscodeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<TranscodeError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve_duration(&self, _path: &Path, hint: Option<f64>) -> MediaDuration {
        if let Some(secs) = hint.filter(|h| h.is_finite() && *h > 0.0) {
            return Some(secs);
        }
        *self.probe_duration.read().await
    }

    async fn run_transcode(
        &self,
        job: &TranscodeJob,
        duration: MediaDuration,
        display: &mut dyn ProgressDisplay,
    ) -> Result<RunOutcome, TranscodeError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.jobs.write().await.push(RecordedTranscode {
            job: job.clone(),
            duration,
        });

        let mut tracker = ProgressTracker::new(duration);
        for (i, line) in self.progress_lines.read().await.iter().enumerate() {
            if let Some(frame) = tracker.handle_line(line, Duration::from_secs(i as u64)) {
                let _ = display.render(&frame);
            }
        }
        let _ = display.finish();

        let exit_code = *self.exit_code.read().await;
        if exit_code == Some(0) {
            return Ok(RunOutcome::Success);
        }

        Ok(RunOutcome::Failure {
            exit_code,
            input_path: job.input_path.clone(),
            output_path: job.output_path.clone(),
            stderr_tail: None,
        })
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}

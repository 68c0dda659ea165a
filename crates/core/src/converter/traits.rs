//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;

use super::display::ProgressDisplay;
use super::error::TranscodeError;
use super::types::{MediaDuration, RunOutcome, TranscodeJob};

/// A transcoder that converts media files while reporting progress.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Determines the total duration of `path` in seconds.
    ///
    /// A finite, positive `hint` is returned as is. Otherwise the file is
    /// probed. Every failure degrades to `None`.
    async fn resolve_duration(&self, path: &Path, hint: Option<f64>) -> MediaDuration;

    /// Runs a transcode to completion, rendering progress to `display`.
    ///
    /// `display.finish()` is called once the progress stream ends, on both
    /// the success and the failure path. A non-zero exit is reported as
    /// [`RunOutcome::Failure`]; only launch and I/O problems are errors.
    async fn run_transcode(
        &self,
        job: &TranscodeJob,
        duration: MediaDuration,
        display: &mut dyn ProgressDisplay,
    ) -> Result<RunOutcome, TranscodeError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscodeError>;
}

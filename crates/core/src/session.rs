//! One conversion from source file to SWF: duration, transcode, cleanup.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::converter::{
    EncodingParams, MediaDuration, ProgressDisplay, RunOutcome, TranscodeError, TranscodeJob,
    Transcoder,
};

/// Extension of converted files.
pub const OUTPUT_EXTENSION: &str = "swf";

/// Parameters for [`convert_file`].
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Duration already known to the caller, e.g. from download metadata.
    pub duration_hint: Option<f64>,
    pub params: EncodingParams,
    /// Keep the source after a successful conversion.
    pub keep_source: bool,
}

/// What happened to the source file after the transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    /// Kept on request.
    Kept,
    /// Deleted.
    Removed,
    /// Not touched because the transcode failed.
    Skipped,
    /// Deletion was attempted and failed.
    Failed(String),
}

/// Result of a completed session.
#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub job: TranscodeJob,
    pub duration: MediaDuration,
    pub outcome: RunOutcome,
    pub cleanup: CleanupStatus,
}

/// Derives `<out_dir>/<basename or input stem>.swf`.
pub fn output_path_for(input: &Path, out_dir: &Path, basename: Option<&str>) -> PathBuf {
    let stem = basename
        .map(|b| b.trim().trim_end_matches(".swf").trim_end())
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .or_else(|| {
            input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "output".to_string());

    out_dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION))
}

/// Deletes the source file. Failures are reported, never raised.
pub async fn cleanup_source(path: &Path) -> CleanupStatus {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!(path = %path.display(), "Removed source file");
            CleanupStatus::Removed
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove source file");
            CleanupStatus::Failed(e.to_string())
        }
    }
}

/// Resolves the duration, runs the transcode and cleans up the source.
///
/// The source is deleted only after a successful transcode and only when
/// `keep_source` is false.
pub async fn convert_file<T>(
    transcoder: &T,
    request: ConvertRequest,
    display: &mut dyn ProgressDisplay,
) -> Result<ConvertReport, TranscodeError>
where
    T: Transcoder + ?Sized,
{
    if !tokio::fs::try_exists(&request.input_path)
        .await
        .unwrap_or(false)
    {
        return Err(TranscodeError::InputNotFound {
            path: request.input_path,
        });
    }

    if let Some(parent) = request
        .output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| TranscodeError::OutputDirectoryFailed {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let duration = transcoder
        .resolve_duration(&request.input_path, request.duration_hint)
        .await;

    let job = TranscodeJob::new(
        Uuid::new_v4().to_string(),
        request.input_path,
        request.output_path,
        request.params,
    );

    info!(
        transcoder = transcoder.name(),
        job_id = %job.job_id,
        duration_secs = ?duration,
        "Starting conversion"
    );
    let outcome = transcoder.run_transcode(&job, duration, display).await?;

    let cleanup = match (&outcome, request.keep_source) {
        (RunOutcome::Failure { .. }, _) => CleanupStatus::Skipped,
        (RunOutcome::Success, true) => CleanupStatus::Kept,
        (RunOutcome::Success, false) => cleanup_source(&job.input_path).await,
    };

    Ok(ConvertReport {
        job,
        duration,
        outcome,
        cleanup,
    })
}

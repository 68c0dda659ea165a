//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a transcode from running to completion.
///
/// A transcode that runs but exits non-zero is not an error; it is reported
/// as [`RunOutcome::Failure`](super::RunOutcome::Failure).
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    EncoderNotFound { path: PathBuf },

    /// FFmpeg binary exists but could not be launched.
    #[error("Failed to launch encoder {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder's progress channel could not be attached.
    #[error("Encoder progress channel unavailable")]
    ProgressChannel,

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while streaming progress or waiting for the encoder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Creates the appropriate launch error for a failed spawn.
    pub fn from_spawn(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::EncoderNotFound { path }
        } else {
            Self::Spawn { path, source: err }
        }
    }

    /// Whether this error points at the environment (missing or broken
    /// encoder) rather than at the input being converted.
    pub fn is_environment_error(&self) -> bool {
        matches!(
            self,
            Self::EncoderNotFound { .. } | Self::Spawn { .. } | Self::ProgressChannel
        )
    }
}

//! Testing utilities and mock implementations.
//!
//! This module provides a mock implementation of the `Transcoder` trait,
//! allowing session and CLI logic to be tested without an ffmpeg install.
//!
//! # Example
//!
//! ```rust,ignore
//! use flashcast_core::testing::MockTranscoder;
//!
//! let transcoder = MockTranscoder::new();
//! transcoder.set_probe_duration(Some(120.0)).await;
//! transcoder.set_progress_lines(["out_time_ms=60000000", "progress=end"]).await;
//!
//! let report = convert_file(&transcoder, request, &mut display).await?;
//! assert_eq!(transcoder.recorded_jobs().await.len(), 1);
//! ```

mod mock_transcoder;

pub use mock_transcoder::{MockTranscoder, RecordedTranscode};

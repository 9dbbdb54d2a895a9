//! Error types for the recording sink.

use thiserror::Error;

/// Errors that can occur during recording.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// A recording is already armed or running.
    #[error("Recording already in progress")]
    AlreadyRecording,

    /// Encoder construction failed.
    #[error("Encoder initialization failed: {0}")]
    Initialization(String),

    /// Encoding a frame failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Finalizing the output file failed.
    #[error("Failed to finalize recording: {0}")]
    Finalize(String),

    /// I/O error from a file-backed encoder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

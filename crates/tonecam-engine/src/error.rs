//! Error types for the engine.

use std::time::Duration;

use thiserror::Error;

use tonecam_present::PresentError;
use tonecam_recorder::RecorderError;
use tonecam_transform::TransformError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transform stage error.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Presentation stage error.
    #[error(transparent)]
    Present(#[from] PresentError),

    /// Recording sink error.
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    /// Recording was requested while no render instance exists.
    #[error("Cannot start recording without a render instance")]
    NoRenderInstance,

    /// Rendering stopped after an unrecoverable error.
    #[error("Rendering stopped after a fatal error: {0}")]
    Faulted(String),

    /// The render context dropped the request; completion is unknown.
    #[error("Render context is gone")]
    RenderContextGone,

    /// The render context did not acknowledge in time; completion is unknown.
    #[error("No acknowledgement from the render context within {0:?}")]
    AckTimeout(Duration),

    /// The render thread could not be spawned.
    #[error("Failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl EngineError {
    /// Returns true if the engine cannot render until it is paused and the
    /// surface is recreated.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transform(e) => e.is_fatal(),
            Self::Faulted(_) => true,
            _ => false,
        }
    }

    /// Returns true if the request may or may not have taken effect.
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, Self::RenderContextGone | Self::AckTimeout(_))
    }
}

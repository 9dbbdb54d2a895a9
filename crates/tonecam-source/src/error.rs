//! Error types for the surface adapter.

use thiserror::Error;

/// Errors that can occur while pulling a frame from the camera surface.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The surface was released by the platform.
    #[error("Camera surface released")]
    SurfaceReleased,

    /// The texture has no new content yet.
    #[error("Camera texture not ready")]
    NotReady,

    /// Platform-specific failure.
    #[error("Surface error: {0}")]
    Platform(String),
}

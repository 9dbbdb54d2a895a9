//! Error types for the transform stage.

use thiserror::Error;

use tonecam_types::Geometry;

/// Errors that can occur in the transform stage.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The engine could not allocate an instance for the geometry.
    #[error("Unable to create render instance for {geometry}: {message}")]
    InstanceCreation { geometry: Geometry, message: String },

    /// The preview geometry has a zero dimension.
    #[error("Invalid preview geometry {0}")]
    InvalidGeometry(Geometry),

    /// No output texture has been allocated for the surface.
    #[error("Output texture not allocated")]
    NoOutputTexture,

    /// Render was requested without a live instance.
    #[error("No render instance")]
    NoInstance,

    /// The engine rejected the render call.
    #[error("Render failed: {0}")]
    Render(String),
}

impl TransformError {
    /// Returns true if the error means the engine cannot produce frames at all.
    ///
    /// A zero geometry is transient (the camera is reconfiguring) and only
    /// skips the pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InstanceCreation { .. } | Self::NoOutputTexture)
    }
}

//! Camera surface adapter.
//!
//! This crate wraps the platform's "new camera frame is ready" signal and the
//! external camera texture. Arrivals are coalesced into a single pending flag;
//! the render context consumes it and pulls the latest texture content.

mod error;
mod frame;

pub use error::SourceError;
pub use frame::{AcquiredFrame, FrameSignal, FrameSource};

use tonecam_types::TransformMatrix;

/// Result type for surface operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Trait for the platform camera surface.
pub trait SurfaceTexture: Send {
    /// Pull the latest camera frame into the external texture.
    fn update_tex_image(&mut self) -> SourceResult<()>;

    /// Sampling transform of the frame pulled by the last update.
    fn transform_matrix(&self) -> SourceResult<TransformMatrix>;

    /// External texture the camera frames are written into.
    fn texture(&self) -> tonecam_types::TextureId;
}

/// Trait for asking the render context to schedule a refresh.
pub trait RenderWaker: Send + Sync {
    /// Request a render pass. Must not block.
    fn request_render(&self);
}

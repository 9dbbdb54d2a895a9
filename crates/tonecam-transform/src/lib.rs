//! Tone-mapping transform stage.
//!
//! This crate owns the lifecycle of the opaque per-resolution instance of the
//! external tone-mapping engine and issues one render call per consumed frame.

mod error;
mod instance;
mod stage;

pub use error::TransformError;
pub use instance::{RawInstance, RenderInstance};
pub use stage::{Prepared, RenderOutput, TransformStage};

use tonecam_types::{Geometry, TextureId, ToneMapConfig, TransformMatrix};

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// One render call into the tone-mapping engine.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Instance the call runs against.
    pub instance: RawInstance,

    /// External camera texture.
    pub input: TextureId,

    /// Sampling transform of the camera texture.
    pub transform: &'a TransformMatrix,

    /// Preview geometry the instance was created for.
    pub geometry: Geometry,

    /// Knob snapshot for this frame, including the effective force flag.
    pub config: &'a ToneMapConfig,

    /// Texture the composited result is written into.
    pub output: TextureId,
}

/// Trait for the external tone-mapping engine.
pub trait TransformEngine: Send {
    /// Allocate engine state for the given preview geometry.
    fn initialize(&mut self, geometry: Geometry) -> TransformResult<RawInstance>;

    /// Destroy all state associated with an instance.
    fn release(&mut self, instance: RawInstance);

    /// Render one frame into the output texture. Blocks until done.
    fn render(&mut self, request: &RenderRequest<'_>) -> TransformResult<()>;

    /// Get engine name for diagnostics.
    fn name(&self) -> &'static str;
}

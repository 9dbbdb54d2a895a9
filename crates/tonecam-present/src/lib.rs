//! Presentation of the composited preview.
//!
//! Draws the transform stage's output texture to the display surface with a
//! fixed full-screen quad and a single-texture shader program.

mod error;
mod quad;
mod stage;

pub use error::PresentError;
pub use quad::{Quad, FRAGMENT_SHADER, QUAD, QUAD_POSITIONS, QUAD_TEX_COORDS, VERTEX_SHADER};
pub use stage::PresentationStage;

use tonecam_types::TextureId;

/// Result type for presentation operations.
pub type PresentResult<T> = Result<T, PresentError>;

/// Handle of a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Allocation parameters for a newly created texture.
///
/// Textures are always sampled with linear filtering and clamp-to-edge
/// wrapping on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
    /// Whether the texture is an external (camera-compatible) texture.
    pub external: bool,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self { external: true }
    }
}

/// Viewport rectangle in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Trait for the 3D API that owns the display surface.
///
/// All methods are called from the render context only.
pub trait DisplayBackend: Send {
    /// Compile and link a program from vertex and fragment sources.
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> PresentResult<ProgramId>;

    /// Allocate a texture.
    fn create_texture(&mut self, params: &TextureParams) -> PresentResult<TextureId>;

    /// Bind the default (display) render target.
    fn bind_default_target(&mut self);

    /// Clear the color buffer of the bound target.
    fn clear(&mut self);

    /// Set the viewport.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Make `program` current.
    fn use_program(&mut self, program: ProgramId);

    /// Bind `texture` to `unit` and point the sampler uniform at it.
    fn bind_texture(&mut self, unit: u32, texture: TextureId, sampler: &str);

    /// Draw the quad with the current program.
    fn draw_quad(&mut self, quad: &Quad);
}

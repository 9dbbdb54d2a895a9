//! Presentation stage.

use tracing::{debug, info};

use tonecam_types::TextureId;

use crate::quad::{FRAGMENT_SHADER, QUAD, VERTEX_SHADER};
use crate::{DisplayBackend, PresentError, PresentResult, ProgramId, TextureParams, Viewport};

/// Sampler uniform of the fragment shader.
const SAMPLER: &str = "sTexture";

/// Draws the output texture to the display surface.
#[derive(Debug, Default)]
pub struct PresentationStage {
    program: Option<ProgramId>,
    surface_width: u32,
    surface_height: u32,
}

impl PresentationStage {
    /// Create an uninitialized stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the program and allocate the output texture for a new surface.
    pub fn init(&mut self, backend: &mut dyn DisplayBackend) -> PresentResult<TextureId> {
        let output = backend.create_texture(&TextureParams::default())?;
        let program = backend.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        self.program = Some(program);
        debug!(?program, %output, "Presentation stage initialized");
        Ok(output)
    }

    /// Record the new surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        info!(width, height, "Display surface changed");
        self.surface_width = width;
        self.surface_height = height;
    }

    /// Draw `texture` over the whole surface.
    pub fn present(
        &self,
        backend: &mut dyn DisplayBackend,
        texture: TextureId,
    ) -> PresentResult<()> {
        let program = self.program.ok_or(PresentError::NotInitialized)?;

        backend.bind_default_target();
        backend.clear();
        backend.set_viewport(Viewport {
            x: 0,
            y: 0,
            width: self.surface_width,
            height: self.surface_height,
        });
        backend.use_program(program);
        backend.bind_texture(0, texture, SAMPLER);
        backend.draw_quad(&QUAD);

        Ok(())
    }
}

//! Synthetic stand-ins for the camera, transform engine and display.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use tonecam_engine::{GeometryProvider, OrientationProvider};
use tonecam_present::{DisplayBackend, PresentResult, ProgramId, Quad, TextureParams, Viewport};
use tonecam_source::{SourceResult, SurfaceTexture};
use tonecam_transform::{RawInstance, RenderRequest, TransformEngine, TransformError, TransformResult};
use tonecam_types::{Geometry, TextureId, TransformMatrix, IDENTITY_MATRIX};

/// Texture the synthetic camera writes into.
pub const CAMERA_TEXTURE: TextureId = TextureId(1);

/// Camera surface whose every update yields a new frame.
#[derive(Debug, Default)]
pub struct TickingSurface {
    updates: u64,
}

impl SurfaceTexture for TickingSurface {
    fn update_tex_image(&mut self) -> SourceResult<()> {
        self.updates += 1;
        trace!(updates = self.updates, "Camera texture updated");
        Ok(())
    }

    fn transform_matrix(&self) -> SourceResult<TransformMatrix> {
        Ok(IDENTITY_MATRIX)
    }

    fn texture(&self) -> TextureId {
        CAMERA_TEXTURE
    }
}

/// Transform engine that only burns time.
pub struct SleepingTransform {
    latency: Duration,
    next_handle: u32,
    live: Option<RawInstance>,
}

impl SleepingTransform {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            next_handle: 0,
            live: None,
        }
    }
}

impl TransformEngine for SleepingTransform {
    fn initialize(&mut self, geometry: Geometry) -> TransformResult<RawInstance> {
        if let Some(live) = self.live {
            return Err(TransformError::InstanceCreation {
                geometry,
                message: format!("instance {} still live", live),
            });
        }
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        let raw = RawInstance::new(self.next_handle).ok_or_else(|| {
            TransformError::InstanceCreation {
                geometry,
                message: "handle space exhausted".into(),
            }
        })?;
        debug!(%raw, %geometry, "Synthetic instance created");
        self.live = Some(raw);
        Ok(raw)
    }

    fn release(&mut self, instance: RawInstance) {
        if self.live == Some(instance) {
            self.live = None;
        }
        debug!(raw = %instance, "Synthetic instance released");
    }

    fn render(&mut self, request: &RenderRequest<'_>) -> TransformResult<()> {
        if self.live != Some(request.instance) {
            return Err(TransformError::Render(format!(
                "unknown instance {}",
                request.instance
            )));
        }
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sleeping"
    }
}

/// Display backend that counts draws.
pub struct CountingDisplay {
    draws: Arc<AtomicU64>,
    next_texture: u32,
}

impl CountingDisplay {
    pub fn new(draws: Arc<AtomicU64>) -> Self {
        Self {
            draws,
            next_texture: CAMERA_TEXTURE.0,
        }
    }
}

impl DisplayBackend for CountingDisplay {
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> PresentResult<ProgramId> {
        trace!(vertex = vertex.len(), fragment = fragment.len(), "Program compiled");
        Ok(ProgramId(1))
    }

    fn create_texture(&mut self, _params: &TextureParams) -> PresentResult<TextureId> {
        self.next_texture += 1;
        Ok(TextureId(self.next_texture))
    }

    fn bind_default_target(&mut self) {}

    fn clear(&mut self) {}

    fn set_viewport(&mut self, _viewport: Viewport) {}

    fn use_program(&mut self, _program: ProgramId) {}

    fn bind_texture(&mut self, _unit: u32, _texture: TextureId, _sampler: &str) {}

    fn draw_quad(&mut self, _quad: &Quad) {
        self.draws.fetch_add(1, Ordering::Relaxed);
    }
}

/// Preview geometry the harness can change mid-run.
pub struct SwitchableGeometry(Mutex<Geometry>);

impl SwitchableGeometry {
    pub fn new(geometry: Geometry) -> Self {
        Self(Mutex::new(geometry))
    }

    pub fn set(&self, geometry: Geometry) {
        *self.0.lock() = geometry;
    }
}

impl GeometryProvider for SwitchableGeometry {
    fn preview_geometry(&self) -> Geometry {
        *self.0.lock()
    }
}

pub struct FixedOrientation(pub u32);

impl OrientationProvider for FixedOrientation {
    fn display_orientation(&self) -> u32 {
        self.0
    }
}

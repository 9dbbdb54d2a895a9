//! Transform stage state machine.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use tonecam_types::{Geometry, TextureId, ToneMapConfig, TransformMatrix, TransformState};

use crate::instance::RenderInstance;
use crate::{RenderRequest, TransformEngine, TransformError, TransformResult};

/// What `TransformStage::prepare` had to do to serve the current geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prepared {
    /// Geometry of an instance released because the preview changed size.
    pub released: Option<Geometry>,

    /// Geometry of a freshly created instance.
    pub created: Option<Geometry>,
}

/// Result of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutput {
    /// Texture holding the composited frame.
    pub texture: TextureId,

    /// Wall time spent in the engine.
    pub duration: Duration,

    /// Whether the call forced a full recompute.
    pub forced: bool,
}

/// Owns the render instance and the shared output texture.
pub struct TransformStage {
    engine: Box<dyn TransformEngine>,
    instance: Option<RenderInstance>,
    output: Option<TextureId>,
    force_update: bool,
    state: TransformState,
}

impl TransformStage {
    /// Create a stage around a tone-mapping engine.
    pub fn new(engine: Box<dyn TransformEngine>) -> Self {
        Self {
            engine,
            instance: None,
            output: None,
            force_update: false,
            state: TransformState::Uninitialized,
        }
    }

    /// Set the texture render calls write into.
    pub fn set_output(&mut self, texture: TextureId) {
        self.output = Some(texture);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransformState {
        self.state
    }

    /// Returns true if a render instance exists.
    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// Make sure an instance exists for `geometry`.
    ///
    /// An instance created for a different geometry is released first. A
    /// creation failure is fatal for the pass. A zero geometry leaves the
    /// current instance untouched and fails with `InvalidGeometry`.
    #[instrument(name = "transform_prepare", skip(self), fields(%geometry))]
    pub fn prepare(&mut self, geometry: Geometry) -> TransformResult<Prepared> {
        if !geometry.is_valid() {
            return Err(TransformError::InvalidGeometry(geometry));
        }
        let mut prepared = Prepared::default();

        if self.instance.as_ref().is_some_and(|i| !i.matches(geometry)) {
            if let Some(stale) = self.instance.take() {
                info!(from = %stale.geometry(), to = %geometry, "Preview geometry changed");
                prepared.released = Some(stale.geometry());
                stale.release(self.engine.as_mut());
                self.state = TransformState::Uninitialized;
            }
        }

        if self.instance.is_none() {
            let instance = RenderInstance::create(self.engine.as_mut(), geometry)?;
            self.instance = Some(instance);
            self.force_update = true;
            self.state = TransformState::Active;
            prepared.created = Some(geometry);
        }

        Ok(prepared)
    }

    /// Run one render call for the camera texture.
    pub fn render(
        &mut self,
        input: TextureId,
        transform: &TransformMatrix,
        config: &ToneMapConfig,
    ) -> TransformResult<RenderOutput> {
        let instance = self.instance.as_ref().ok_or(TransformError::NoInstance)?;
        let output = self.output.ok_or(TransformError::NoOutputTexture)?;

        let forced = self.force_update || config.force_update;
        let effective = ToneMapConfig {
            force_update: forced,
            ..config.clone()
        };

        let request = RenderRequest {
            instance: instance.raw(),
            input,
            transform,
            geometry: instance.geometry(),
            config: &effective,
            output,
        };

        let started = Instant::now();
        self.engine.render(&request)?;
        let duration = started.elapsed();

        self.force_update = false;

        Ok(RenderOutput {
            texture: output,
            duration,
            forced,
        })
    }

    /// Release the instance, if any. Returns the geometry it served.
    pub fn release(&mut self) -> Option<Geometry> {
        let released = self.instance.take().map(|instance| {
            let geometry = instance.geometry();
            instance.release(self.engine.as_mut());
            info!(%geometry, "Render instance released");
            geometry
        });

        if released.is_none() {
            debug!("No render instance to release");
        }

        self.state = TransformState::Released;
        released
    }
}

impl Drop for TransformStage {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            warn!(raw = %instance.raw(), "Render instance still live at drop, releasing");
            instance.release(self.engine.as_mut());
        }
    }
}

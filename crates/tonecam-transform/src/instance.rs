//! Owned wrapper around the engine's opaque instance handle.

use std::fmt;
use std::num::NonZeroU32;

use tracing::{debug, info};

use tonecam_types::Geometry;

use crate::{TransformEngine, TransformError, TransformResult};

/// Raw engine handle. Zero is the engine's "not created" sentinel and is
/// unrepresentable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawInstance(NonZeroU32);

impl RawInstance {
    /// Wrap a raw handle returned by the engine; `None` for the zero sentinel.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// The raw handle value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for RawInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// A live engine instance scoped to one preview geometry.
///
/// Not `Clone`: releasing consumes the wrapper, so a handle is released at
/// most once and never aliased by two live wrappers.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderInstance {
    raw: RawInstance,
    geometry: Geometry,
}

impl RenderInstance {
    /// Ask the engine for a new instance.
    pub fn create(engine: &mut dyn TransformEngine, geometry: Geometry) -> TransformResult<Self> {
        if !geometry.is_valid() {
            return Err(TransformError::InvalidGeometry(geometry));
        }

        let raw = engine.initialize(geometry)?;
        info!(%raw, %geometry, engine = engine.name(), "Render instance created");
        Ok(Self { raw, geometry })
    }

    /// Destroy the instance.
    pub fn release(self, engine: &mut dyn TransformEngine) {
        debug!(raw = %self.raw, geometry = %self.geometry, "Releasing render instance");
        engine.release(self.raw);
    }

    /// The raw handle.
    pub fn raw(&self) -> RawInstance {
        self.raw
    }

    /// Geometry the instance was created for.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Returns true if the instance can serve frames of `geometry`.
    pub fn matches(&self, geometry: Geometry) -> bool {
        self.geometry == geometry
    }
}

//! Lifecycle controller for the tone-mapped camera preview.
//!
//! This crate glues the frame source, transform, presentation and recording
//! stages together. All of their state lives behind one lock that only the
//! render context mutates; control requests are marshalled onto the render
//! context and block until it acknowledges them.

mod driver;
mod error;
mod events;
mod metrics;
mod orchestrator;
mod settings;
mod state;

pub use driver::{wake_channel, ChannelWaker, RenderThread};
pub use error::{EngineError, EngineResult};
pub use metrics::{FpsMeter, MetricsCollector};
pub use orchestrator::{EngineHandle, Renderer, RENDER_TASK_CAPACITY};
pub use settings::ToneMapSettings;
pub use state::{PassOutcome, PassReport};

pub use tonecam_recorder::RecordingSummary;

use std::sync::Arc;

use crossbeam_channel::Sender;

use tonecam_present::DisplayBackend;
use tonecam_recorder::{EncoderFactory, MediaIndexer};
use tonecam_source::{RenderWaker, SurfaceTexture};
use tonecam_transform::TransformEngine;
use tonecam_types::{EngineConfig, EngineEvent, Geometry};

/// Trait for the source of the current preview dimensions.
pub trait GeometryProvider: Send + Sync {
    /// Current preview geometry. Polled once per render pass.
    fn preview_geometry(&self) -> Geometry;
}

/// Trait for the source of the current display orientation.
pub trait OrientationProvider: Send + Sync {
    /// Display orientation in degrees.
    fn display_orientation(&self) -> u32;
}

/// External collaborators the engine drives.
pub struct Collaborators {
    /// Camera surface.
    pub surface: Box<dyn SurfaceTexture>,

    /// Tone-mapping engine.
    pub transform: Box<dyn TransformEngine>,

    /// 3D API owning the display surface.
    pub display: Box<dyn DisplayBackend>,

    /// Encoder construction.
    pub encoders: Box<dyn EncoderFactory>,

    /// Media index notifications.
    pub indexer: Arc<dyn MediaIndexer>,

    /// Preview geometry.
    pub geometry: Arc<dyn GeometryProvider>,

    /// Display orientation.
    pub orientation: Arc<dyn OrientationProvider>,

    /// Render-context wake-up.
    pub waker: Arc<dyn RenderWaker>,
}

/// Create an engine: a control handle and the render-context driver.
pub fn create_engine(
    config: EngineConfig,
    collaborators: Collaborators,
    event_tx: Sender<EngineEvent>,
) -> (EngineHandle, Renderer) {
    orchestrator::build(config, collaborators, event_tx)
}

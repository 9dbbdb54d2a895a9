//! Shared types for the tonecam preview engine.
//!
//! This crate defines the value types that cross crate boundaries: preview
//! geometry, texture identifiers, the tone-mapping knob set, the engine
//! configuration, state enums and the events the engine reports to its host.

mod config;
mod events;
mod state;
mod types;

pub use config::{EngineConfig, RecordingPolicy, RenderLoopConfig, ToneMapConfig};
pub use events::EngineEvent;
pub use state::{RecordingState, RenderStatus, TransformState};
pub use types::{EngineMetrics, Geometry, TextureId, TransformMatrix, IDENTITY_MATRIX};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for events (engine → host).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}

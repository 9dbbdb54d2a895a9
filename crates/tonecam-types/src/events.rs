//! Events sent from the engine to the host.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{EngineMetrics, Geometry};

/// Events that the engine reports to its host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A render instance was created for the given geometry.
    InstanceCreated { geometry: Geometry },

    /// The render instance was released.
    InstanceReleased { geometry: Geometry },

    /// An encoder session was constructed.
    RecordingStarted {
        path: PathBuf,
        geometry: Geometry,
        orientation_degrees: u32,
    },

    /// The encoder was closed and the file handed to the media indexer.
    RecordingStopped { path: PathBuf, frames_encoded: u64 },

    /// The encoder failed; the session was cleared and preview continues.
    RecordingFailed { message: String },

    /// An armed request never saw a render instance and was cancelled.
    RecordingExpired { path: PathBuf },

    /// Periodic metrics.
    Metrics(EngineMetrics),

    /// Rendering stopped because of an unrecoverable error.
    Fatal { message: String },
}

//! State machine types reported by the engine.

use serde::{Deserialize, Serialize};

/// Lifecycle of the transform stage's render instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformState {
    /// No instance exists yet (or the last one was invalidated).
    #[default]
    Uninitialized,

    /// An instance exists for the current preview geometry.
    Active,

    /// The instance was released by a pause or shutdown.
    Released,
}

/// Lifecycle of the recording sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    /// Not recording.
    #[default]
    Idle,

    /// Recording requested; encoder not constructed yet.
    Armed,

    /// Encoder session exists; frames are fed once the start delay elapsed.
    Encoding,
}

/// Whether the render context still issues passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderStatus {
    /// Passes run normally.
    #[default]
    Running,

    /// Paused by the host; the next surface creation resumes.
    Paused,

    /// A fatal error stopped rendering.
    Faulted {
        /// Error message.
        message: String,
    },
}

impl RenderStatus {
    /// Returns true if the engine hit a fatal error.
    pub fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted { .. })
    }
}

//! Common value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Row-major 4x4 sampling transform reported by the camera surface.
pub type TransformMatrix = [f32; 16];

/// Identity sampling transform.
pub const IDENTITY_MATRIX: TransformMatrix = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Preview dimensions as reported by the preview geometry provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,
}

impl Geometry {
    /// Create a new geometry.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true when both dimensions are non-zero.
    pub fn is_valid(&self) -> bool {
        self.width != 0 && self.height != 0
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Name of a GPU texture owned by the display backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Observational engine metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    /// Presented frames per second over the measurement window.
    pub fps: f32,

    /// Frames presented since the surface was created.
    pub frames_presented: u64,

    /// Frames handed to the encoder.
    pub frames_encoded: u64,

    /// Passes skipped because the surface could not deliver a frame.
    pub dropped_acquisitions: u64,

    /// Arrival notifications folded into an already pending frame.
    pub coalesced_notifications: u64,

    /// Duration of the last transform call in microseconds.
    pub last_transform_micros: u64,

    /// Number of render instances created so far.
    pub instances_created: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_validity() {
        assert!(Geometry::new(1920, 1080).is_valid());
        assert!(!Geometry::new(0, 1080).is_valid());
        assert!(!Geometry::new(1920, 0).is_valid());
        assert!(!Geometry::default().is_valid());
    }

    #[test]
    fn test_geometry_display() {
        assert_eq!(Geometry::new(1280, 720).to_string(), "1280x720");
    }
}

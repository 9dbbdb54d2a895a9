//! Harness configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tonecam_types::{EngineConfig, Geometry};

/// Soak run parameters. Every field has a default, so a partial JSON file
/// only needs the knobs it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Engine configuration handed to `create_engine`.
    pub engine: EngineConfig,

    /// Synthetic camera frame rate.
    pub camera_fps: u32,

    /// Total run length.
    pub duration_ms: u64,

    /// Preview geometry at start-up.
    pub preview_width: u32,
    pub preview_height: u32,

    /// Display surface size.
    pub surface_width: u32,
    pub surface_height: u32,

    /// Display orientation reported to the encoder.
    pub orientation_degrees: u32,

    /// When to request a recording, relative to start. `None` disables
    /// recording.
    pub record_after_ms: Option<u64>,

    /// How long to record before stopping.
    pub record_for_ms: u64,

    /// Start delay passed with the recording request.
    pub start_delay_ms: u64,

    /// Switch preview geometry at this offset, e.g. a camera resolution
    /// change mid-recording.
    pub resize_after_ms: Option<u64>,
    pub resize_width: u32,
    pub resize_height: u32,

    /// Simulated cost of one transform call.
    pub transform_latency_ms: u64,

    /// Simulated cost of encoding one frame on the writer thread.
    pub encode_latency_ms: u64,

    /// Frames the encoder buffers before dropping.
    pub encoder_queue: usize,

    /// Directory recordings are written to.
    pub output_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            camera_fps: 30,
            duration_ms: 3_000,
            preview_width: 1920,
            preview_height: 1080,
            surface_width: 1080,
            surface_height: 1920,
            orientation_degrees: 90,
            record_after_ms: Some(500),
            record_for_ms: 1_500,
            start_delay_ms: 0,
            resize_after_ms: None,
            resize_width: 1280,
            resize_height: 720,
            transform_latency_ms: 4,
            encode_latency_ms: 8,
            encoder_queue: 8,
            output_dir: std::env::temp_dir(),
        }
    }
}

impl HarnessConfig {
    /// Load from a JSON file, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading harness config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing harness config {}", path.display()))?;
        Ok(config)
    }

    pub fn preview(&self) -> Geometry {
        Geometry::new(self.preview_width, self.preview_height)
    }

    pub fn resized(&self) -> Geometry {
        Geometry::new(self.resize_width, self.resize_height)
    }

    /// Interval between synthetic camera frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.camera_fps.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = HarnessConfig::load(None).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.preview(), Geometry::new(1920, 1080));
        assert_eq!(config.frame_interval(), Duration::from_nanos(33_333_333));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"camera_fps": 60, "record_after_ms": null, "engine": {{"tone_map": {{"gamma": 0.7}}}}}}"#
        )
        .unwrap();

        let config = HarnessConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.camera_fps, 60);
        assert_eq!(config.record_after_ms, None);
        assert!((config.engine.tone_map.gamma - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.engine.recording.frame_rate, 24);
        assert_eq!(config.duration_ms, 3_000);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = HarnessConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing harness config"));
    }
}

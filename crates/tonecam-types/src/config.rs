//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tone-mapping knobs handed to the transform engine on every render call.
///
/// Values are not clamped here; the transform engine documents the valid
/// ranges and rejects anything outside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMapConfig {
    /// Enable local (spatially varying) adaptation.
    pub local_adaptation: bool,

    /// Maximum amplification applied to dark regions.
    pub max_amplify: f32,

    /// Per-channel lower gain limit.
    pub min_limit: [f32; 3],

    /// Per-channel upper gain limit.
    pub max_limit: [f32; 3],

    /// Chroma desaturation factor for normally lit regions.
    pub uv_desat: i32,

    /// Chroma desaturation factor for shadows.
    pub dark_uv_desat: i32,

    /// Temporal mix factor between consecutive frames (0.0 - 1.0).
    pub mix_factor: f32,

    /// Output gamma.
    pub gamma: f32,

    /// Black level threshold.
    pub max_black_level: f32,

    /// Attenuation applied below the black level threshold.
    pub black_level_atten: f32,

    /// One-shot request to recompute all temporal state on the next call.
    pub force_update: bool,
}

impl Default for ToneMapConfig {
    fn default() -> Self {
        Self {
            local_adaptation: true,
            max_amplify: 4.0,
            min_limit: [0.5, 0.5, 0.5],
            max_limit: [3.0, 2.0, 2.0],
            uv_desat: 9,
            dark_uv_desat: 5,
            mix_factor: 0.1,
            gamma: 0.5,
            max_black_level: 64.0,
            black_level_atten: 0.5,
            force_update: false,
        }
    }
}

/// Encoder session policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingPolicy {
    /// Target frames per second for the encoder.
    pub frame_rate: u32,

    /// Target bitrate in bits per second.
    pub bitrate: u32,

    /// Render ticks an armed request may wait for a render instance before
    /// it is cancelled.
    pub max_pending_passes: u32,
}

impl Default for RecordingPolicy {
    fn default() -> Self {
        Self {
            frame_rate: 24,
            bitrate: 20_000_000,
            max_pending_passes: 120,
        }
    }
}

/// Render-context scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLoopConfig {
    /// Interval between display refresh ticks in milliseconds.
    pub refresh_interval_ms: u64,

    /// Window size (in frames) of the frame-rate meter.
    pub fps_window: usize,

    /// Interval between metrics events in milliseconds; 0 disables them.
    pub metrics_interval_ms: u64,
}

impl RenderLoopConfig {
    /// Refresh interval as a duration.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    /// Metrics interval, or `None` when metrics events are disabled.
    pub fn metrics_interval(&self) -> Option<Duration> {
        (self.metrics_interval_ms > 0).then(|| Duration::from_millis(self.metrics_interval_ms))
    }
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 16,
            fps_window: 5,
            metrics_interval_ms: 1000,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial tone-mapping knobs.
    pub tone_map: ToneMapConfig,

    /// Recording policy.
    pub recording: RecordingPolicy,

    /// Render loop scheduling.
    pub render: RenderLoopConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "recording": { "bitrate": 8000000 }, "tone_map": { "gamma": 0.7 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.recording.bitrate, 8_000_000);
        assert_eq!(config.recording.frame_rate, 24);
        assert_eq!(config.tone_map.gamma, 0.7);
        assert_eq!(config.tone_map.max_limit, [3.0, 2.0, 2.0]);
        assert_eq!(config.render, RenderLoopConfig::default());
    }

    #[test]
    fn test_refresh_interval_never_zero() {
        let render = RenderLoopConfig {
            refresh_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(render.refresh_interval(), Duration::from_millis(1));
    }
}

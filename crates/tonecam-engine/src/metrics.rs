//! Metrics collection and reporting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use tonecam_types::EngineMetrics;

/// Frame rate over the last `window` frames.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: usize,
    stamps: VecDeque<Instant>,
}

impl FpsMeter {
    /// Create a meter averaging over `window` frames (at least 2).
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            stamps: VecDeque::with_capacity(window),
        }
    }

    /// Record a frame at `now`.
    pub fn measure(&mut self, now: Instant) {
        if self.stamps.len() == self.window {
            self.stamps.pop_front();
        }
        self.stamps.push_back(now);
    }

    /// Frames per second over the window, 0 until two frames were seen.
    pub fn fps(&self) -> f32 {
        match (self.stamps.front(), self.stamps.back()) {
            (Some(first), Some(last)) if self.stamps.len() > 1 => {
                let span = last.duration_since(*first).as_secs_f32();
                if span > 0.0 {
                    (self.stamps.len() - 1) as f32 / span
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// Forget all samples.
    pub fn flush(&mut self) {
        self.stamps.clear();
    }
}

/// Collects engine metrics. Purely observational.
pub struct MetricsCollector {
    fps: Mutex<FpsMeter>,
    frames_presented: AtomicU64,
    frames_encoded: AtomicU64,
    last_transform_micros: AtomicU64,
    instances_created: AtomicU64,
}

impl MetricsCollector {
    /// Create a collector with an fps window of `fps_window` frames.
    pub fn new(fps_window: usize) -> Self {
        Self {
            fps: Mutex::new(FpsMeter::new(fps_window)),
            frames_presented: AtomicU64::new(0),
            frames_encoded: AtomicU64::new(0),
            last_transform_micros: AtomicU64::new(0),
            instances_created: AtomicU64::new(0),
        }
    }

    /// Reset the frame-rate window, e.g. on surface creation.
    pub fn flush(&self) {
        self.fps.lock().flush();
    }

    /// Record a presented frame.
    pub fn record_presented(&self, now: Instant) {
        self.frames_presented.fetch_add(1, Ordering::Relaxed);
        self.fps.lock().measure(now);
    }

    /// Record a frame handed to the encoder.
    pub fn record_encoded(&self) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the duration of a transform call.
    pub fn record_transform(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.last_transform_micros.store(micros, Ordering::Relaxed);
    }

    /// Record a render instance creation.
    pub fn record_instance_created(&self) {
        self.instances_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Current frame rate.
    pub fn fps(&self) -> f32 {
        self.fps.lock().fps()
    }

    /// Get current metrics snapshot. Surface counters are owned by the frame
    /// signal and passed in.
    pub fn snapshot(&self, dropped_acquisitions: u64, coalesced_notifications: u64) -> EngineMetrics {
        EngineMetrics {
            fps: self.fps(),
            frames_presented: self.frames_presented.load(Ordering::Relaxed),
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            dropped_acquisitions,
            coalesced_notifications,
            last_transform_micros: self.last_transform_micros.load(Ordering::Relaxed),
            instances_created: self.instances_created.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(5)
    }
}

//! Live tone-mapping knobs.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use tonecam_types::ToneMapConfig;

/// Knob set shared between the control context and the render context.
///
/// The render context takes one snapshot per pass, so a concurrent update is
/// seen either entirely or not at all.
#[derive(Debug, Default)]
pub struct ToneMapSettings {
    current: RwLock<ToneMapConfig>,
}

impl ToneMapSettings {
    /// Create settings with initial values.
    pub fn new(config: ToneMapConfig) -> Self {
        Self {
            current: RwLock::new(config),
        }
    }

    /// Current values.
    pub fn get(&self) -> ToneMapConfig {
        self.current.read().clone()
    }

    /// Replace all values.
    pub fn set(&self, config: ToneMapConfig) {
        *self.current.write() = config;
    }

    /// Modify values in place.
    pub fn update(&self, f: impl FnOnce(&mut ToneMapConfig)) {
        f(&mut self.current.write());
    }

    /// Ask the next render call to recompute all temporal state.
    pub fn request_full_recompute(&self) {
        self.current.write().force_update = true;
    }

    /// Snapshot for one render pass. Consumes a pending one-shot
    /// `force_update`.
    pub fn snapshot(&self) -> ToneMapConfig {
        let guard = self.current.upgradable_read();
        let snapshot = guard.clone();
        if snapshot.force_update {
            RwLockUpgradableReadGuard::upgrade(guard).force_update = false;
        }
        snapshot
    }
}

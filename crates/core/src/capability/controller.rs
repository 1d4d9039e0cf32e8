//! Session-scoped capability controller.

use std::sync::Arc;

use tokio::sync::watch;

use super::env::EnvironmentReader;
use super::profile::{CapabilityProfile, EffectPolicy, LowEndThresholds, compute_profile};
use crate::Error;
use crate::prefs::{PrefKey, PreferenceStore};

/// Holds the startup profile, the live reduced-motion subscription, and the
/// user's lite-mode override.
///
/// Hardware fields never change after [`start`](Self::start). Dropping the
/// controller drops its reduced-motion subscription.
pub struct CapabilityController {
    profile: CapabilityProfile,
    reduced_motion: watch::Receiver<bool>,
    prefs: Arc<dyn PreferenceStore>,
}

impl CapabilityController {
    /// Probe the environment once and subscribe to reduced-motion changes.
    pub async fn start(
        env: &dyn EnvironmentReader, prefs: Arc<dyn PreferenceStore>, thresholds: LowEndThresholds,
    ) -> Self {
        let reduced_motion = env.watch_reduced_motion();
        let profile = compute_profile(env, prefs.as_ref(), thresholds).await;

        tracing::info!(
            low_end = profile.is_low_end_device,
            lite_mode = profile.lite_mode_active,
            gpu = profile.supports_gpu_rendering,
            memory_gib = profile.device_memory_gib,
            cores = profile.logical_cores,
            "capability profile computed"
        );

        Self { profile, reduced_motion, prefs }
    }

    /// Current profile, with the live reduced-motion value folded in.
    pub fn profile(&self) -> CapabilityProfile {
        CapabilityProfile { prefers_reduced_motion: self.prefers_reduced_motion(), ..self.profile.clone() }
    }

    pub fn prefers_reduced_motion(&self) -> bool {
        *self.reduced_motion.borrow()
    }

    pub fn lite_mode_active(&self) -> bool {
        self.profile.lite_mode_active
    }

    pub fn supports_gpu_rendering(&self) -> bool {
        self.profile.supports_gpu_rendering
    }

    pub fn should_reduce_animations(&self) -> bool {
        self.prefers_reduced_motion() || self.profile.lite_mode_active
    }

    pub fn effects(&self) -> EffectPolicy {
        EffectPolicy::derive(self.should_reduce_animations(), self.profile.lite_mode_active, self.profile.supports_gpu_rendering)
    }

    /// Apply the user's lite-mode override and persist it for later sessions.
    ///
    /// Hardware probes are not re-run. The override takes effect for this
    /// session even if persisting it fails; the error is still returned.
    pub async fn set_lite_mode(&mut self, enabled: bool) -> Result<(), Error> {
        self.profile.lite_mode_active = enabled;
        tracing::info!(lite_mode = enabled, "lite mode changed");

        self.prefs
            .set(PrefKey::LiteMode.as_str(), if enabled { "true" } else { "false" })
            .await
    }

    /// Wait for the next reduced-motion change and return the new value.
    ///
    /// Returns `None` once the environment stops publishing.
    pub async fn reduced_motion_changed(&mut self) -> Option<bool> {
        self.reduced_motion.changed().await.ok()?;
        Some(*self.reduced_motion.borrow_and_update())
    }
}

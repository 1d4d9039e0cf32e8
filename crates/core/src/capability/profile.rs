//! Capability profile derivation.

use serde::{Deserialize, Serialize};

use super::env::EnvironmentReader;
use crate::prefs::{PrefKey, PreferenceStore, parse_flag, read_pref};

/// Memory assumed when the platform does not report it.
pub const DEFAULT_DEVICE_MEMORY_GIB: f64 = 4.0;

/// Core count assumed when the platform does not report it.
pub const DEFAULT_LOGICAL_CORES: u32 = 4;

/// Below either threshold a device is classified low-end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowEndThresholds {
    pub min_memory_gib: f64,
    pub min_cores: u32,
}

impl Default for LowEndThresholds {
    fn default() -> Self {
        Self { min_memory_gib: 4.0, min_cores: 4 }
    }
}

/// Snapshot of what the device can do and what the user asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CapabilityProfile {
    pub device_memory_gib: f64,
    pub logical_cores: u32,
    pub supports_gpu_rendering: bool,
    pub prefers_reduced_motion: bool,
    pub is_low_end_device: bool,
    pub lite_mode_active: bool,
}

impl CapabilityProfile {
    pub fn should_reduce_animations(&self) -> bool {
        self.prefers_reduced_motion || self.lite_mode_active
    }

    pub fn effects(&self) -> EffectPolicy {
        EffectPolicy::derive(self.should_reduce_animations(), self.lite_mode_active, self.supports_gpu_rendering)
    }
}

/// Mount decisions for the expensive visual effects. Each gate is
/// independent of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EffectPolicy {
    /// Continuous background animation (the "matrix rain").
    pub background_animation: bool,
    /// 3D particle scene.
    pub scene_3d: bool,
}

impl EffectPolicy {
    pub fn derive(reduce_animations: bool, lite_mode: bool, gpu: bool) -> Self {
        Self { background_animation: !reduce_animations, scene_3d: gpu && !lite_mode && !reduce_animations }
    }
}

pub fn classify_low_end(memory_gib: f64, cores: u32, gpu: bool, thresholds: LowEndThresholds) -> bool {
    memory_gib < thresholds.min_memory_gib || cores < thresholds.min_cores || !gpu
}

fn probe_memory(env: &dyn EnvironmentReader) -> f64 {
    match env.device_memory_gib() {
        Ok(Some(gib)) if gib.is_finite() && gib > 0.0 => gib,
        Ok(_) => DEFAULT_DEVICE_MEMORY_GIB,
        Err(e) => {
            tracing::debug!(error = %e, "device memory probe failed, assuming default");
            DEFAULT_DEVICE_MEMORY_GIB
        }
    }
}

fn probe_cores(env: &dyn EnvironmentReader) -> u32 {
    match env.logical_cores() {
        Ok(Some(cores)) if cores > 0 => cores,
        Ok(_) => DEFAULT_LOGICAL_CORES,
        Err(e) => {
            tracing::debug!(error = %e, "core count probe failed, assuming default");
            DEFAULT_LOGICAL_CORES
        }
    }
}

fn probe_gpu(env: &dyn EnvironmentReader) -> bool {
    env.acquire_gpu_context().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "gpu context probe failed");
        false
    })
}

fn probe_reduced_motion(env: &dyn EnvironmentReader) -> bool {
    env.prefers_reduced_motion().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "reduced-motion probe failed");
        false
    })
}

/// Probe the environment and resolve lite mode.
///
/// Never fails: every probe falls back to its default, and an unreadable or
/// malformed `liteMode` preference falls back to the low-end classification.
/// Calling it again without preference changes yields the same result.
pub async fn compute_profile(
    env: &dyn EnvironmentReader, prefs: &dyn PreferenceStore, thresholds: LowEndThresholds,
) -> CapabilityProfile {
    let device_memory_gib = probe_memory(env);
    let logical_cores = probe_cores(env);
    let supports_gpu_rendering = probe_gpu(env);
    let prefers_reduced_motion = probe_reduced_motion(env);

    let is_low_end_device = classify_low_end(device_memory_gib, logical_cores, supports_gpu_rendering, thresholds);

    let stored = read_pref(prefs, PrefKey::LiteMode).await;
    let lite_mode_active = match stored.as_deref().map(|v| (v, parse_flag(v))) {
        Some((_, Some(flag))) => flag,
        Some((raw, None)) => {
            tracing::debug!(value = raw, "ignoring malformed liteMode preference");
            is_low_end_device
        }
        None => is_low_end_device,
    };

    CapabilityProfile {
        device_memory_gib,
        logical_cores,
        supports_gpu_rendering,
        prefers_reduced_motion,
        is_low_end_device,
        lite_mode_active,
    }
}

//! Device capability profiling and the rendering policy derived from it.
//!
//! Signals are read once at startup through an [`EnvironmentReader`], except
//! the reduced-motion preference which stays live for the whole session.
//! The result gates which expensive visual effects the view layer mounts.

pub mod controller;
pub mod env;
pub mod profile;

pub use controller::CapabilityController;
pub use env::{EnvironmentReader, HostEnvironment, ProbeError, Signal, StaticEnvironment};
pub use profile::{CapabilityProfile, EffectPolicy, LowEndThresholds, classify_low_end, compute_profile};

//! Core types and shared functionality for folio.
//!
//! This crate provides:
//! - Versioned response cache with SQLite backend
//! - Key-value preference storage
//! - Device capability profiling and the rendering policy derived from it
//! - Appearance (theme palette, display mode) resolution
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod capability;
pub mod config;
pub mod error;
pub mod http;
pub mod prefs;
pub mod theme;

pub use cache::{CacheDb, CacheStorage};
pub use capability::{CapabilityController, CapabilityProfile, EffectPolicy, EnvironmentReader};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Destination, Request, Response, ResponseKind};
pub use prefs::{MemoryPreferences, PrefKey, PreferenceStore};

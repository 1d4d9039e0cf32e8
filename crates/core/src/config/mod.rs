//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FOLIO_*)
//! 2. TOML config file (if FOLIO_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::capability::LowEndThresholds;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FOLIO_*)
/// 2. TOML config file (if FOLIO_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding cache generations and preferences.
    ///
    /// Set via FOLIO_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application is served from. Responses from this origin are
    /// "basic" and eligible for caching.
    ///
    /// Set via FOLIO_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix of the application shell, e.g. `/portfolio-elite`.
    ///
    /// Set via FOLIO_BASE_PATH environment variable.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Cache generation name prefix.
    ///
    /// Set via FOLIO_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Semantic version embedded in the generation name. Changing it is what
    /// triggers a new install and eviction cycle.
    ///
    /// Set via FOLIO_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// User-Agent string for network requests.
    ///
    /// Set via FOLIO_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FOLIO_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Activate a freshly installed generation immediately instead of
    /// waiting for pages controlled by the previous one to close.
    ///
    /// Set via FOLIO_SKIP_WAITING_ON_INSTALL environment variable.
    #[serde(default)]
    pub skip_waiting_on_install: bool,

    /// Devices with less memory than this (GiB) are classified low-end.
    ///
    /// Set via FOLIO_LOW_END_MEMORY_GIB environment variable.
    #[serde(default = "default_low_end_memory_gib")]
    pub low_end_memory_gib: f64,

    /// Devices with fewer logical cores than this are classified low-end.
    ///
    /// Set via FOLIO_LOW_END_CORES environment variable.
    #[serde(default = "default_low_end_cores")]
    pub low_end_cores: u32,

    /// Override the probed device memory (GiB).
    #[serde(default)]
    pub device_memory_gib: Option<f64>,

    /// Override the probed logical core count.
    #[serde(default)]
    pub logical_cores: Option<u32>,

    /// Override GPU rendering support detection.
    #[serde(default)]
    pub gpu_rendering: Option<bool>,

    /// Initial reduced-motion preference of the host.
    #[serde(default)]
    pub reduced_motion: Option<bool>,

    /// Whether the host prefers a dark color scheme.
    #[serde(default)]
    pub prefers_dark: Option<bool>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./folio-cache.sqlite")
}

fn default_origin() -> String {
    "https://arturocruzarm.github.io".into()
}

fn default_base_path() -> String {
    "/portfolio-elite".into()
}

fn default_cache_prefix() -> String {
    "portfolio-elite".into()
}

fn default_cache_version() -> String {
    "1.0.0".into()
}

fn default_user_agent() -> String {
    "folio/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_low_end_memory_gib() -> f64 {
    4.0
}

fn default_low_end_cores() -> u32 {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            base_path: default_base_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            skip_waiting_on_install: false,
            low_end_memory_gib: default_low_end_memory_gib(),
            low_end_cores: default_low_end_cores(),
            device_memory_gib: None,
            logical_cores: None,
            gpu_rendering: None,
            reduced_motion: None,
            prefers_dark: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the cache generation this build installs, e.g.
    /// `portfolio-elite-v1.0.0`.
    pub fn generation_name(&self) -> String {
        format!("{}-v{}", self.cache_prefix, self.cache_version)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {other}") }),
        }
    }

    /// Root-relative URLs pre-populated at install: the application root,
    /// the entry document, and the web-app manifest.
    pub fn manifest_paths(&self) -> Vec<String> {
        let base = self.base_path.trim_end_matches('/');
        vec![
            format!("{base}/"),
            format!("{base}/index.html"),
            format!("{base}/manifest.webmanifest"),
        ]
    }

    /// Document served for failed navigations while offline.
    pub fn offline_fallback_path(&self) -> String {
        format!("{}/index.html", self.base_path.trim_end_matches('/'))
    }

    pub fn thresholds(&self) -> LowEndThresholds {
        LowEndThresholds { min_memory_gib: self.low_end_memory_gib, min_cores: self.low_end_cores }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FOLIO_`
    /// 2. TOML file from `FOLIO_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FOLIO_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FOLIO_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

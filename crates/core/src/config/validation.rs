//! Configuration validation rules.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

/// `MAJOR.MINOR.PATCH` with numeric components.
fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `base_path` does not start with `/`
    /// - `cache_prefix` is empty or contains whitespace
    /// - `cache_version` is not `MAJOR.MINOR.PATCH`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - a low-end threshold is not positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if !self.base_path.starts_with('/') {
            return Err(invalid("base_path", "must start with '/'"));
        }

        if self.cache_prefix.is_empty() || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must be non-empty and contain no whitespace"));
        }

        if !is_semver(&self.cache_version) {
            return Err(invalid("cache_version", "must be MAJOR.MINOR.PATCH"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.low_end_memory_gib.is_nan() || self.low_end_memory_gib <= 0.0 {
            return Err(invalid("low_end_memory_gib", "must be greater than 0"));
        }
        if self.low_end_cores == 0 {
            return Err(invalid("low_end_cores", "must be greater than 0"));
        }

        if self.skip_waiting_on_install {
            tracing::debug!("skip_waiting_on_install set; new generations activate without waiting");
        }

        Ok(())
    }
}

//! String-valued user preference storage.
//!
//! Both controllers take an injected [`PreferenceStore`] instead of reaching
//! for ambient storage. [`CacheDb`](crate::CacheDb) persists preferences in
//! its `preferences` table; [`MemoryPreferences`] keeps them in a map.

mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;

/// Well-known preference keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    /// `light` | `dark`
    ThemeMode,
    /// `true` | `false`
    LiteMode,
    /// One of the built-in palette names.
    SelectedTheme,
    /// `auto` | `light` | `dark`
    DisplayMode,
}

impl PrefKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefKey::ThemeMode => "theme",
            PrefKey::LiteMode => "liteMode",
            PrefKey::SelectedTheme => "selectedTheme",
            PrefKey::DisplayMode => "displayMode",
        }
    }
}

/// Key-value preference store.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;
}

/// Read a preference, treating storage failures as "absent".
///
/// Preferences are only ever hints; a broken store must not block startup.
pub async fn read_pref(store: &dyn PreferenceStore, key: PrefKey) -> Option<String> {
    match store.get(key.as_str()).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "preference read failed, using default");
            None
        }
    }
}

/// Parse a stored `true`/`false` flag. Anything else is treated as absent.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// In-memory preference store.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing values, e.g. to simulate a previous session.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { values: RwLock::new(values) }
    }

    /// Copy of everything stored.
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.values.read().await.clone()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.values.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

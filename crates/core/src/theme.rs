//! Appearance preferences: color palette, light/dark theme mode, and the
//! display-mode override.
//!
//! All values are read with graceful fallback. Absent or invalid stored
//! values fall back to the system preference or the default palette.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::capability::EnvironmentReader;
use crate::prefs::{PrefKey, PreferenceStore, read_pref};

/// A named color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub name: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
}

impl ThemePalette {
    /// Custom style properties written onto the document root.
    pub fn css_variables(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("--primary-500", self.primary),
            ("--primary-600", self.secondary),
            ("--accent-500", self.accent),
            ("--background", self.background),
            ("--surface", self.surface),
            ("--text-primary", self.text),
        ])
    }
}

pub const PALETTES: &[ThemePalette] = &[
    ThemePalette {
        name: "Elite Blue",
        primary: "#3b82f6",
        secondary: "#8b5cf6",
        accent: "#06b6d4",
        background: "#0f172a",
        surface: "#1e293b",
        text: "#f8fafc",
    },
    ThemePalette {
        name: "Cyber Purple",
        primary: "#8b5cf6",
        secondary: "#ec4899",
        accent: "#f59e0b",
        background: "#1a0a2e",
        surface: "#16213e",
        text: "#e5e7eb",
    },
    ThemePalette {
        name: "Ocean Deep",
        primary: "#0ea5e9",
        secondary: "#06b6d4",
        accent: "#10b981",
        background: "#0c1321",
        surface: "#1e3a8a",
        text: "#f0f9ff",
    },
    ThemePalette {
        name: "Sunset Orange",
        primary: "#f59e0b",
        secondary: "#ef4444",
        accent: "#8b5cf6",
        background: "#1a1a1a",
        surface: "#2d1b69",
        text: "#fef3c7",
    },
];

pub fn default_palette() -> &'static ThemePalette {
    &PALETTES[0]
}

pub fn find_palette(name: &str) -> Option<&'static ThemePalette> {
    PALETTES.iter().find(|p| p.name == name)
}

/// Stored light/dark toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }
}

/// Display-mode override chosen in the customizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Auto,
    Light,
    Dark,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Auto => "auto",
            DisplayMode::Light => "light",
            DisplayMode::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(DisplayMode::Auto),
            "light" => Some(DisplayMode::Light),
            "dark" => Some(DisplayMode::Dark),
            _ => None,
        }
    }
}

/// Resolved appearance for the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appearance {
    pub dark: bool,
    pub display_mode: DisplayMode,
    pub theme_mode: Option<ThemeMode>,
    pub palette: &'static str,
    pub css_variables: BTreeMap<&'static str, &'static str>,
}

/// An explicit light/dark display mode wins; otherwise the stored theme
/// toggle, then the system preference.
pub fn resolve_dark_mode(display_mode: DisplayMode, theme_mode: Option<ThemeMode>, prefers_dark: bool) -> bool {
    match display_mode {
        DisplayMode::Dark => true,
        DisplayMode::Light => false,
        DisplayMode::Auto => match theme_mode {
            Some(mode) => mode == ThemeMode::Dark,
            None => prefers_dark,
        },
    }
}

fn system_prefers_dark(env: &dyn EnvironmentReader) -> bool {
    env.prefers_dark().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "color scheme probe failed, assuming light");
        false
    })
}

async fn read_parsed<T>(prefs: &dyn PreferenceStore, key: PrefKey, parse: fn(&str) -> Option<T>) -> Option<T> {
    let raw = read_pref(prefs, key).await?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::debug!(key = key.as_str(), value = %raw, "ignoring invalid stored preference");
    }
    parsed
}

/// Read every appearance preference, falling back to defaults.
pub async fn load_appearance(prefs: &dyn PreferenceStore, env: &dyn EnvironmentReader) -> Appearance {
    let display_mode = read_parsed(prefs, PrefKey::DisplayMode, DisplayMode::parse)
        .await
        .unwrap_or_default();
    let theme_mode = read_parsed(prefs, PrefKey::ThemeMode, ThemeMode::parse).await;
    let palette = read_parsed(prefs, PrefKey::SelectedTheme, find_palette)
        .await
        .unwrap_or_else(default_palette);

    Appearance {
        dark: resolve_dark_mode(display_mode, theme_mode, system_prefers_dark(env)),
        display_mode,
        theme_mode,
        palette: palette.name,
        css_variables: palette.css_variables(),
    }
}

/// Flip between light and dark and return the resulting appearance.
///
/// An explicit light/dark display mode is reset to `auto` so the stored
/// theme takes effect.
pub async fn toggle_dark_mode(prefs: &dyn PreferenceStore, env: &dyn EnvironmentReader) -> Result<Appearance, Error> {
    let current = load_appearance(prefs, env).await;
    let next = if current.dark { ThemeMode::Light } else { ThemeMode::Dark };
    prefs.set(PrefKey::ThemeMode.as_str(), next.as_str()).await?;
    if current.display_mode != DisplayMode::Auto {
        prefs.set(PrefKey::DisplayMode.as_str(), DisplayMode::Auto.as_str()).await?;
    }
    Ok(load_appearance(prefs, env).await)
}

/// Persist a display-mode override and return the resulting appearance.
pub async fn set_display_mode(
    prefs: &dyn PreferenceStore, env: &dyn EnvironmentReader, mode: DisplayMode,
) -> Result<Appearance, Error> {
    prefs.set(PrefKey::DisplayMode.as_str(), mode.as_str()).await?;
    Ok(load_appearance(prefs, env).await)
}

/// Select a palette by name and persist it.
///
/// # Errors
///
/// Returns `Error::UnknownTheme` if the name is not a built-in palette.
pub async fn apply_palette(prefs: &dyn PreferenceStore, name: &str) -> Result<&'static ThemePalette, Error> {
    let palette = find_palette(name).ok_or_else(|| Error::UnknownTheme(name.to_string()))?;
    prefs.set(PrefKey::SelectedTheme.as_str(), palette.name).await?;
    tracing::debug!(palette = palette.name, "theme palette applied");
    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Signal, StaticEnvironment};
    use crate::prefs::MemoryPreferences;

    fn env(dark: bool) -> StaticEnvironment {
        StaticEnvironment::new().dark(Signal::Present(dark))
    }

    #[test]
    fn test_resolve_dark_mode_precedence() {
        assert!(resolve_dark_mode(DisplayMode::Dark, Some(ThemeMode::Light), false));
        assert!(!resolve_dark_mode(DisplayMode::Light, Some(ThemeMode::Dark), true));
        assert!(resolve_dark_mode(DisplayMode::Auto, Some(ThemeMode::Dark), false));
        assert!(!resolve_dark_mode(DisplayMode::Auto, Some(ThemeMode::Light), true));
        assert!(resolve_dark_mode(DisplayMode::Auto, None, true));
        assert!(!resolve_dark_mode(DisplayMode::Auto, None, false));
    }

    #[test]
    fn test_palette_css_variables() {
        let vars = find_palette("Ocean Deep").unwrap().css_variables();
        assert_eq!(vars.len(), 6);
        assert_eq!(vars["--primary-500"], "#0ea5e9");
        assert_eq!(vars["--text-primary"], "#f0f9ff");
    }

    #[tokio::test]
    async fn test_load_appearance_defaults() {
        let prefs = MemoryPreferences::new();
        let appearance = load_appearance(&prefs, &env(true)).await;
        assert!(appearance.dark);
        assert_eq!(appearance.display_mode, DisplayMode::Auto);
        assert_eq!(appearance.theme_mode, None);
        assert_eq!(appearance.palette, "Elite Blue");
    }

    #[tokio::test]
    async fn test_load_appearance_invalid_values_fall_back() {
        let prefs = MemoryPreferences::with_values([
            ("displayMode", "sepia"),
            ("theme", "midnight"),
            ("selectedTheme", "Neon Pink"),
        ]);
        let appearance = load_appearance(&prefs, &env(false)).await;
        assert!(!appearance.dark);
        assert_eq!(appearance.display_mode, DisplayMode::Auto);
        assert_eq!(appearance.theme_mode, None);
        assert_eq!(appearance.palette, "Elite Blue");
    }

    #[tokio::test]
    async fn test_unsupported_color_scheme_is_light() {
        let prefs = MemoryPreferences::new();
        let env = StaticEnvironment::new().dark(Signal::Broken);
        assert!(!load_appearance(&prefs, &env).await.dark);
    }

    #[tokio::test]
    async fn test_apply_palette_persists() {
        let prefs = MemoryPreferences::new();
        let palette = apply_palette(&prefs, "Cyber Purple").await.unwrap();
        assert_eq!(palette.primary, "#8b5cf6");
        assert_eq!(prefs.get("selectedTheme").await.unwrap(), Some("Cyber Purple".to_string()));

        let appearance = load_appearance(&prefs, &env(false)).await;
        assert_eq!(appearance.palette, "Cyber Purple");
        assert_eq!(appearance.css_variables["--accent-500"], "#f59e0b");
    }

    #[tokio::test]
    async fn test_apply_unknown_palette() {
        let prefs = MemoryPreferences::new();
        let result = apply_palette(&prefs, "Neon Pink").await;
        assert!(matches!(result, Err(Error::UnknownTheme(_))));
        assert!(prefs.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_dark_mode() {
        let prefs = MemoryPreferences::new();
        let env = env(false);

        let toggled = toggle_dark_mode(&prefs, &env).await.unwrap();
        assert!(toggled.dark);
        assert_eq!(toggled.theme_mode, Some(ThemeMode::Dark));
        assert_eq!(prefs.get("theme").await.unwrap(), Some("dark".to_string()));

        let toggled = toggle_dark_mode(&prefs, &env).await.unwrap();
        assert!(!toggled.dark);
        assert_eq!(toggled.theme_mode, Some(ThemeMode::Light));
    }

    #[tokio::test]
    async fn test_toggle_clears_display_override() {
        let prefs = MemoryPreferences::with_values([("displayMode", "dark")]);
        let env = env(false);

        let mut expected_dark = false;
        for _ in 0..3 {
            let toggled = toggle_dark_mode(&prefs, &env).await.unwrap();
            assert_eq!(toggled.dark, expected_dark);
            assert_eq!(toggled.display_mode, DisplayMode::Auto);
            assert_eq!(load_appearance(&prefs, &env).await, toggled);
            expected_dark = !expected_dark;
        }
        assert_eq!(prefs.get("displayMode").await.unwrap(), Some("auto".to_string()));
    }

    #[tokio::test]
    async fn test_display_mode_overrides_theme() {
        let prefs = MemoryPreferences::with_values([("theme", "dark")]);
        let appearance = set_display_mode(&prefs, &env(true), DisplayMode::Light).await.unwrap();
        assert!(!appearance.dark);
        assert_eq!(prefs.get("displayMode").await.unwrap(), Some("light".to_string()));
    }
}

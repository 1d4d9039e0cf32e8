//! Appearance tools: appearance_get, theme_apply, display_mode_set, and
//! dark_mode_toggle.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_core::theme::{self, DisplayMode, PALETTES};

use super::json_result;
use crate::state::AppState;

pub async fn appearance_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let appearance = theme::load_appearance(state.prefs.as_ref(), state.env.as_ref()).await;
    json_result(&appearance)
}

/// Parameters for the theme_apply tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThemeApplyParams {
    /// Palette name: "Elite Blue", "Cyber Purple", "Ocean Deep", or
    /// "Sunset Orange".
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeApplyOutput {
    pub palette: &'static str,
    pub css_variables: BTreeMap<&'static str, &'static str>,
    pub available: Vec<&'static str>,
}

pub async fn theme_apply_impl(state: &AppState, params: ThemeApplyParams) -> Result<CallToolResult, McpError> {
    let palette = theme::apply_palette(state.prefs.as_ref(), params.name.trim()).await?;
    let output = ThemeApplyOutput {
        palette: palette.name,
        css_variables: palette.css_variables(),
        available: PALETTES.iter().map(|p| p.name).collect(),
    };
    json_result(&output)
}

/// Parameters for the display_mode_set tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DisplayModeParams {
    /// "auto", "light", or "dark".
    pub mode: DisplayMode,
}

pub async fn display_mode_impl(state: &AppState, params: DisplayModeParams) -> Result<CallToolResult, McpError> {
    let appearance = theme::set_display_mode(state.prefs.as_ref(), state.env.as_ref(), params.mode).await?;
    json_result(&appearance)
}

pub async fn toggle_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let appearance = theme::toggle_dark_mode(state.prefs.as_ref(), state.env.as_ref()).await?;
    json_result(&appearance)
}

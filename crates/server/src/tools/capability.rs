//! capability_profile and lite_mode_set tool implementations.
//!
//! Expose the session's capability profile and the rendering decisions
//! derived from it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_core::{CapabilityController, CapabilityProfile, EffectPolicy};

use super::json_result;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CapabilityOutput {
    pub profile: CapabilityProfile,
    pub should_reduce_animations: bool,
    pub effects: EffectPolicy,
    /// Set by lite_mode_set: whether the override was saved for later
    /// sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
}

impl CapabilityOutput {
    fn from_controller(controller: &CapabilityController) -> Self {
        Self {
            profile: controller.profile(),
            should_reduce_animations: controller.should_reduce_animations(),
            effects: controller.effects(),
            persisted: None,
        }
    }
}

pub async fn profile_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let controller = state.capability.read().await;
    json_result(&CapabilityOutput::from_controller(&controller))
}

/// Parameters for the lite_mode_set tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LiteModeParams {
    /// Turn lite mode on or off.
    pub enabled: bool,
}

pub async fn lite_mode_impl(state: &AppState, params: LiteModeParams) -> Result<CallToolResult, McpError> {
    let mut controller = state.capability.write().await;

    let persisted = match controller.set_lite_mode(params.enabled).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "lite mode applied for this session only");
            false
        }
    };

    let output = CapabilityOutput { persisted: Some(persisted), ..CapabilityOutput::from_controller(&controller) };
    json_result(&output)
}

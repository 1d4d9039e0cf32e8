//! shell_status tool implementation.
//!
//! Reports the active and waiting workers and what is stored.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::RegistrationStatus;

use super::super::json_result;
use crate::state::AppState;

/// Parameters for the shell_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ShellStatusParams {
    /// Wait for background cache writes before reporting.
    #[serde(default)]
    pub settle: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShellStatusOutput {
    /// Generation this build installs.
    pub configured_generation: String,
    #[serde(flatten)]
    pub registration: RegistrationStatus,
}

pub async fn status_impl(state: &AppState, params: ShellStatusParams) -> Result<CallToolResult, McpError> {
    if params.settle {
        state.registration.settle().await;
    }

    let output = ShellStatusOutput {
        configured_generation: state.config.generation_name(),
        registration: state.registration.status().await?,
    };
    json_result(&output)
}

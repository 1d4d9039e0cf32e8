//! shell_message tool implementation.
//!
//! Posts a control message (e.g. `{"type": "SKIP_WAITING"}`) to the waiting
//! worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;
use crate::state::AppState;

/// Parameters for the shell_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellMessageParams {
    /// Structured message, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellMessageOutput {
    /// Whether a waiting worker recognised the message.
    pub recognized: bool,
    pub active_generation: Option<String>,
}

pub async fn message_impl(state: &AppState, params: ShellMessageParams) -> Result<CallToolResult, McpError> {
    let recognized = state.registration.post_message(&params.message).await?;
    let output = ShellMessageOutput { recognized, active_generation: state.registration.active_generation().await };
    json_result(&output)
}

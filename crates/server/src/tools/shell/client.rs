//! shell_client tool implementation.
//!
//! Opens and closes pages. Pages hold their worker until they close, which
//! is what keeps an updated worker waiting.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;
use crate::error::ToolError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Open,
    Close,
}

/// Parameters for the shell_client tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellClientParams {
    /// "open" or "close".
    pub action: ClientAction,

    /// Page to close. Required for "close".
    #[serde(default)]
    pub client: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellClientOutput {
    pub client: u64,
    /// False when closing an id that was not open.
    pub found: bool,
    pub active_generation: Option<String>,
}

pub async fn client_impl(state: &AppState, params: ShellClientParams) -> Result<CallToolResult, McpError> {
    let (client, found) = match params.action {
        ClientAction::Open => (state.registration.open_client().await, true),
        ClientAction::Close => {
            let id = params
                .client
                .ok_or_else(|| ToolError::InvalidInput("client id is required to close a page".into()))?;
            (id, state.registration.close_client(id).await?)
        }
    };

    let output = ShellClientOutput { client, found, active_generation: state.registration.active_generation().await };
    json_result(&output)
}

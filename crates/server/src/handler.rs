//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::state::AppState;
use crate::tools::appearance::{self, DisplayModeParams, ThemeApplyParams};
use crate::tools::capability::{self, LiteModeParams};
use crate::tools::shell::{self, ShellClientParams, ShellFetchParams, ShellMessageParams, ShellStatusParams};

/// The main MCP server handler for folio-mcp.
#[derive(Clone)]
pub struct FolioServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FolioServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(description = "Report the active and waiting offline workers, stored cache generations, and open pages.")]
    async fn shell_status(&self, params: Parameters<ShellStatusParams>) -> Result<CallToolResult, McpError> {
        shell::status_impl(&self.state, params.0).await
    }

    /// Fetch through the offline shell.
    ///
    /// Cache first, then network with write-through; failed navigations get
    /// the cached entry document.
    #[tool(description = "Fetch a URL through the offline shell. Reports whether the response came from the cache, the network, or the offline fallback.")]
    async fn shell_fetch(&self, params: Parameters<ShellFetchParams>) -> Result<CallToolResult, McpError> {
        shell::fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Post a control message such as {\"type\": \"SKIP_WAITING\"} to the waiting worker.")]
    async fn shell_message(&self, params: Parameters<ShellMessageParams>) -> Result<CallToolResult, McpError> {
        shell::message_impl(&self.state, params.0).await
    }

    #[tool(description = "Open or close a page controlled by the offline shell.")]
    async fn shell_client(&self, params: Parameters<ShellClientParams>) -> Result<CallToolResult, McpError> {
        shell::client_impl(&self.state, params.0).await
    }

    #[tool(description = "Device capability profile and the visual effects it allows.")]
    async fn capability_profile(&self) -> Result<CallToolResult, McpError> {
        capability::profile_impl(&self.state).await
    }

    #[tool(description = "Turn lite mode on or off. The choice is remembered across sessions.")]
    async fn lite_mode_set(&self, params: Parameters<LiteModeParams>) -> Result<CallToolResult, McpError> {
        capability::lite_mode_impl(&self.state, params.0).await
    }

    #[tool(description = "Resolved appearance: dark mode, display mode, palette, and CSS variables.")]
    async fn appearance_get(&self) -> Result<CallToolResult, McpError> {
        appearance::appearance_impl(&self.state).await
    }

    #[tool(description = "Apply a built-in color palette and return its CSS variables.")]
    async fn theme_apply(&self, params: Parameters<ThemeApplyParams>) -> Result<CallToolResult, McpError> {
        appearance::theme_apply_impl(&self.state, params.0).await
    }

    #[tool(description = "Set the display mode override: auto, light, or dark.")]
    async fn display_mode_set(&self, params: Parameters<DisplayModeParams>) -> Result<CallToolResult, McpError> {
        appearance::display_mode_impl(&self.state, params.0).await
    }

    #[tool(description = "Flip between light and dark theme.")]
    async fn dark_mode_toggle(&self) -> Result<CallToolResult, McpError> {
        appearance::toggle_impl(&self.state).await
    }
}

impl ServerHandler for FolioServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "folio-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

//! shell_fetch tool implementation.
//!
//! Issues a request as a page would and reports where the response came
//! from: the cache, the network, or the offline fallback.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::fetch::canonicalize;
use folio_core::{Destination, Error, Request};

use super::super::json_result;
use crate::state::AppState;

/// Parameters for the shell_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// Treat the request as a full-page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Page issuing the request. Omit for a new page.
    #[serde(default)]
    pub client: Option<u64>,

    /// Maximum number of body characters returned (default: 4000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_chars() -> usize {
    4000
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchOutput {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub status_text: String,
    /// "cache", "network", "fallback", or "passthrough".
    pub source: String,
    /// A copy is being written to the cache.
    pub stored: bool,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    pub body: String,
    pub body_truncated: bool,
    pub fetched_at: String,
}

pub async fn fetch_impl(state: &AppState, params: ShellFetchParams) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method must not be empty".into()).into());
    }

    let url = canonicalize(&params.url, &state.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let destination = if params.navigate { Destination::Document } else { Destination::Empty };
    let request = Request::get(url)
        .with_method(params.method.trim())
        .with_destination(destination);

    let served = state.registration.fetch(params.client, &request).await?;
    let response = &served.response;

    let text = String::from_utf8_lossy(&response.body);
    let body_truncated = text.chars().count() > params.max_chars;
    let body = text.chars().take(params.max_chars).collect();

    tracing::debug!(url = %request.url, source = served.source.as_str(), status = response.status, "shell fetch");

    let output = ShellFetchOutput {
        url: request.url.to_string(),
        final_url: response.url.to_string(),
        status: response.status,
        status_text: response.status_text.clone(),
        source: served.source.as_str().to_string(),
        stored: served.stored,
        content_type: response.content_type().map(str::to_string),
        body_bytes: response.body.len(),
        body,
        body_truncated,
        fetched_at: Utc::now().to_rfc3339(),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output_json, test_state};

    fn params(url: &str) -> ShellFetchParams {
        ShellFetchParams {
            url: url.into(),
            navigate: false,
            method: default_method(),
            client: None,
            max_chars: default_max_chars(),
        }
    }

    #[tokio::test]
    async fn test_fetch_shell_from_cache() {
        let (state, _) = test_state().await;
        let output = output_json(&fetch_impl(&state, params("/app/index.html")).await.unwrap());
        assert_eq!(output["source"], "cache");
        assert_eq!(output["status"], 200);
        assert_eq!(output["body"], "page:/app/index.html");
        assert_eq!(output["url"], "https://example.com/app/index.html");
    }

    #[tokio::test]
    async fn test_fetch_miss_then_hit() {
        let (state, _) = test_state().await;

        let first = output_json(&fetch_impl(&state, params("/app/about.json")).await.unwrap());
        assert_eq!(first["source"], "network");
        assert_eq!(first["stored"], true);

        state.registration.settle().await;
        let second = output_json(&fetch_impl(&state, params("/app/about.json")).await.unwrap());
        assert_eq!(second["source"], "cache");
    }

    #[tokio::test]
    async fn test_cross_origin_not_stored() {
        let (state, _) = test_state().await;
        let output = output_json(&fetch_impl(&state, params("https://cdn.example.net/font.woff2")).await.unwrap());
        assert_eq!(output["source"], "network");
        assert_eq!(output["stored"], false);
    }

    #[tokio::test]
    async fn test_offline_navigation_fallback() {
        let (state, network) = test_state().await;
        network.go_offline();

        let output = output_json(
            &fetch_impl(&state, ShellFetchParams { navigate: true, ..params("/app/projects/42") })
                .await
                .unwrap(),
        );
        assert_eq!(output["source"], "fallback");
        assert_eq!(output["body"], "page:/app/index.html");

        let asset = fetch_impl(&state, params("/app/hero.webp")).await;
        assert!(asset.is_err());
    }

    #[tokio::test]
    async fn test_body_truncation() {
        let (state, _) = test_state().await;
        let output = output_json(&fetch_impl(&state, ShellFetchParams { max_chars: 4, ..params("/app/") }).await.unwrap());
        assert_eq!(output["body"], "page");
        assert_eq!(output["body_truncated"], true);
    }

    #[tokio::test]
    async fn test_empty_method_rejected() {
        let (state, _) = test_state().await;
        let result = fetch_impl(&state, ShellFetchParams { method: " ".into(), ..params("/app/") }).await;
        assert!(result.is_err());
    }
}

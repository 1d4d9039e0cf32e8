//! folio-mcp server entry point.
//!
//! Loads configuration, installs the offline shell, probes the device, and
//! serves the MCP tools on stdio. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use folio_client::{FetchClient, FetchConfig};
use folio_core::capability::HostEnvironment;
use folio_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db = %config.db_path.display(), generation = %config.generation_name(), "starting folio-mcp on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);
    let env = Arc::new(HostEnvironment::from_config(&config));
    let state = state::AppState::new(config, db, env, network).await?;

    match state.install_shell().await {
        Ok(outcome) => tracing::info!(?outcome, "offline shell registered"),
        Err(e) => tracing::warn!(error = %e, "offline shell install failed, continuing with stored generations"),
    }

    let handler = handler::FolioServer::new(Arc::new(state));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}

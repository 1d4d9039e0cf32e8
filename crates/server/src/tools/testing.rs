//! In-memory application state for tool tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use rmcp::model::CallToolResult;

use folio_client::Network;
use folio_core::capability::StaticEnvironment;
use folio_core::{AppConfig, CacheDb, Error, Request, Response, ResponseKind};

use crate::state::AppState;

/// Answers every same-origin path with `page:<path>` until taken offline.
#[derive(Default)]
pub struct StubNetwork {
    offline: AtomicBool,
}

impl StubNetwork {
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        let kind = if request.url.host_str() == Some("example.com") { ResponseKind::Basic } else { ResponseKind::Cors };
        Ok(Response {
            status: 200,
            status_text: "OK".into(),
            headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
            body: Bytes::from(format!("page:{}", request.url.path())),
            kind,
            url: request.url.clone(),
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        origin: "https://example.com".into(),
        base_path: "/app".into(),
        cache_prefix: "app".into(),
        cache_version: "1.0.0".into(),
        ..AppConfig::default()
    }
}

pub async fn test_state_with(env: StaticEnvironment) -> (AppState, Arc<StubNetwork>) {
    let network = Arc::new(StubNetwork::default());
    let db = CacheDb::open_in_memory().await.unwrap();
    let state = AppState::new(test_config(), db, Arc::new(env), network.clone())
        .await
        .unwrap();
    (state, network)
}

/// State with the shell worker installed and active.
pub async fn test_state() -> (AppState, Arc<StubNetwork>) {
    let (state, network) = test_state_with(StaticEnvironment::new()).await;
    state.install_shell().await.unwrap();
    (state, network)
}

pub fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}

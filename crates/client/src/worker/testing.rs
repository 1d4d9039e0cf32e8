//! Scripted network and store doubles for worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use folio_core::{CacheDb, CacheStorage, Error, Request, Response, ResponseKind};

use super::WorkerConfig;

pub const ORIGIN: &str = "https://example.com";

pub fn worker_config(version: &str) -> WorkerConfig {
    WorkerConfig {
        generation: format!("app-v{version}"),
        origin: Url::parse(ORIGIN).unwrap(),
        manifest: vec!["/app/".into(), "/app/index.html".into(), "/app/manifest.webmanifest".into()],
        offline_fallback: "/app/index.html".into(),
        skip_waiting_on_install: false,
    }
}

/// Network serving the app shell manifest.
pub fn shell_network() -> Arc<FakeNetwork> {
    let network = FakeNetwork::default();
    for path in ["/app/", "/app/index.html", "/app/manifest.webmanifest"] {
        network.respond(path, 200, ResponseKind::Basic, &format!("shell:{path}"));
    }
    Arc::new(network)
}

#[derive(Clone)]
enum Route {
    Reply { status: u16, kind: ResponseKind, body: String },
    Fail,
}

/// A [`Network`](crate::Network) with per-path scripted answers.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Route>>,
    log: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl FakeNetwork {
    pub fn respond(&self, path: &str, status: u16, kind: ResponseKind, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route::Reply { status, kind, body: body.to_string() });
    }

    pub fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Fail);
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|p| p.as_str() == path).count()
    }
}

#[async_trait]
impl crate::Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let path = request.url.path().to_string();
        self.log.lock().unwrap().push(path.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let route = self.routes.lock().unwrap().get(&path).cloned();
        match route {
            Some(Route::Reply { status, kind, body }) => Ok(Response {
                status,
                status_text: if status == 200 { "OK".into() } else { String::new() },
                headers: vec![("content-type".into(), "text/html".into())],
                body: Bytes::from(body),
                kind,
                url: request.url.clone(),
            }),
            Some(Route::Fail) => Err(Error::Network(format!("connection reset: {}", request.url))),
            None => Ok(Response {
                status: 404,
                status_text: "Not Found".into(),
                headers: Vec::new(),
                body: Bytes::new(),
                kind: ResponseKind::Basic,
                url: request.url.clone(),
            }),
        }
    }
}

/// Store whose single-entry writes can be switched off.
pub struct FailingWrites {
    inner: CacheDb,
    writes: AtomicBool,
}

impl FailingWrites {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner, writes: AtomicBool::new(true) }
    }

    pub fn allow_writes(&self, allowed: bool) {
        self.writes.store(allowed, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for FailingWrites {
    async fn open(&self, generation: &str) -> Result<bool, Error> {
        self.inner.open(generation).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.inner.delete(generation).await
    }

    async fn match_request(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_request(generation, request).await
    }

    async fn put(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        if !self.writes.load(Ordering::SeqCst) {
            return Err(Error::InvalidState("storage quota exceeded".into()));
        }
        self.inner.put(generation, request, response).await
    }

    async fn put_all(&self, generation: &str, pairs: &[(Request, Response)]) -> Result<(), Error> {
        self.inner.put_all(generation, pairs).await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.inner.entry_count(generation).await
    }
}

/// Store whose single-entry writes complete only after a delay.
pub struct SlowWrites {
    inner: CacheDb,
    delay: Duration,
}

impl SlowWrites {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner, delay: Duration::from_millis(50) }
    }
}

#[async_trait]
impl CacheStorage for SlowWrites {
    async fn open(&self, generation: &str) -> Result<bool, Error> {
        self.inner.open(generation).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.inner.delete(generation).await
    }

    async fn match_request(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_request(generation, request).await
    }

    async fn put(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(generation, request, response).await
    }

    async fn put_all(&self, generation: &str, pairs: &[(Request, Response)]) -> Result<(), Error> {
        self.inner.put_all(generation, pairs).await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.inner.entry_count(generation).await
    }
}

//! Offline cache controller.
//!
//! One [`OfflineCacheController`] is the worker for one cache generation. It
//! is an explicit state machine with one async handler per lifecycle event:
//!
//! - [`install`](OfflineCacheController::install): pre-populate the manifest
//!   into the generation; all or nothing.
//! - [`activate`](OfflineCacheController::activate): evict every other
//!   generation.
//! - [`handle_fetch`](OfflineCacheController::handle_fetch): cache-first,
//!   network write-through, offline navigation fallback.
//! - [`handle_message`](OfflineCacheController::handle_message): the
//!   `SKIP_WAITING` command.
//!
//! Background cache writes are tracked as pending work; [`settle`] waits for
//! them. [`Registration`] coordinates installing, waiting, and active
//! workers and the pages they control.
//!
//! [`settle`]: OfflineCacheController::settle

pub mod lifecycle;
pub mod message;
pub mod registration;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::try_join_all;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use url::Url;

use folio_core::{AppConfig, CacheStorage, Error, Request, Response};

use crate::Network;
use crate::fetch::{canonicalize, is_fetchable};

pub use lifecycle::Phase;
pub use message::ControlMessage;
pub use registration::{ClientId, RegisterOutcome, Registration, RegistrationStatus, Served, Source, WorkerStatus};

/// What a worker needs to know about its generation.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Generation name, e.g. `portfolio-elite-v1.0.0`.
    pub generation: String,
    /// Origin that root-relative manifest paths resolve against.
    pub origin: Url,
    /// Root-relative URLs pre-populated at install.
    pub manifest: Vec<String>,
    /// Document served for failed navigations.
    pub offline_fallback: String,
    /// Skip waiting as soon as install succeeds.
    pub skip_waiting_on_install: bool,
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            generation: config.generation_name(),
            origin: config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?,
            manifest: config.manifest_paths(),
            offline_fallback: config.offline_fallback_path(),
            skip_waiting_on_install: config.skip_waiting_on_install,
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, Error> {
        canonicalize(path, &self.origin).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }
}

/// Result of offering a fetch to the worker.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the request goes to the network untouched.
    Passthrough,
    /// Served from the current generation.
    Cache(Response),
    /// Fetched from the network. `queued` is true when a copy is being
    /// written to the cache in the background.
    Network { response: Response, queued: bool },
    /// The network failed on a navigation; the cached fallback document.
    Fallback(Response),
}

/// The worker for one cache generation.
pub struct OfflineCacheController {
    config: WorkerConfig,
    store: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    phase: watch::Sender<Phase>,
    skip_waiting: AtomicBool,
    pending: Mutex<JoinSet<()>>,
}

impl OfflineCacheController {
    pub fn new(config: WorkerConfig, store: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            store,
            network,
            phase: watch::Sender::new(Phase::Parsed),
            skip_waiting: AtomicBool::new(false),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub fn generation(&self) -> &str {
        &self.config.generation
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Observe phase changes.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Whether this worker asked to activate without waiting.
    pub fn wants_skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    fn advance(&self, next: Phase) -> Result<(), Error> {
        let mut from = Phase::Parsed;
        let moved = self.phase.send_if_modified(|phase| {
            from = *phase;
            if phase.can_advance_to(next) {
                *phase = next;
                true
            } else {
                false
            }
        });

        if moved {
            tracing::info!(generation = %self.config.generation, from = %from, to = %next, "worker phase changed");
            Ok(())
        } else {
            Err(Error::InvalidState(format!("{}: cannot move from {from} to {next}", self.config.generation)))
        }
    }

    /// Retire this worker. Idempotent.
    pub fn mark_redundant(&self) {
        if self.phase() != Phase::Redundant {
            let _ = self.advance(Phase::Redundant);
        }
    }

    /// Open the generation and write every manifest URL into it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any manifest URL cannot be fetched or
    /// answers with a non-ok status. The generation is then discarded (if
    /// this install created it) and the worker becomes redundant.
    pub async fn install(&self) -> Result<(), Error> {
        self.advance(Phase::Installing)?;

        match self.populate().await {
            Ok(count) => {
                self.advance(Phase::Installed)?;
                tracing::info!(generation = %self.config.generation, entries = count, "app shell cached");
                if self.config.skip_waiting_on_install {
                    self.skip_waiting();
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(generation = %self.config.generation, error = %e, "install failed");
                self.mark_redundant();
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<usize, Error> {
        let generation = &self.config.generation;
        let created = self.store.open(generation).await?;

        let result = match self.fetch_manifest().await {
            Ok(pairs) => self.store.put_all(generation, &pairs).await.map(|_| pairs.len()),
            Err(e) => Err(e),
        };

        if result.is_err()
            && created
            && let Err(e) = self.store.delete(generation).await
        {
            tracing::warn!(generation = %generation, error = %e, "failed to discard partial generation");
        }

        result
    }

    async fn fetch_manifest(&self) -> Result<Vec<(Request, Response)>, Error> {
        let requests = self
            .config
            .manifest
            .iter()
            .map(|path| self.config.resolve(path).map(Request::get))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::InstallFailed(e.to_string()))?;

        let fetches = requests.into_iter().map(|request| async move {
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
            if !response.ok() {
                return Err(Error::InstallFailed(format!("{} returned status {}", request.url, response.status)));
            }
            Ok((request, response))
        });

        try_join_all(fetches).await
    }

    /// Ask to activate without waiting for pages of the previous worker to
    /// close. Only meaningful before activation.
    pub fn skip_waiting(&self) {
        if !self.skip_waiting.swap(true, Ordering::SeqCst) {
            tracing::info!(generation = %self.config.generation, "skip waiting requested");
        }
    }

    /// Evict every stored generation except this one.
    ///
    /// Store failures during eviction are logged and skipped so that taking
    /// control of pages is never blocked. Returns the evicted names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.advance(Phase::Activating)?;

        let names = match self.store.keys().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not list cache generations, skipping eviction");
                Vec::new()
            }
        };

        let mut evicted = Vec::new();
        for name in names.into_iter().filter(|n| n != &self.config.generation) {
            match self.store.delete(&name).await {
                Ok(_) => {
                    tracing::info!(generation = %name, "evicted stale generation");
                    evicted.push(name);
                }
                Err(e) => tracing::warn!(generation = %name, error = %e, "failed to evict stale generation"),
            }
        }

        self.advance(Phase::Activated)?;
        Ok(evicted)
    }

    /// Offer a page request to the worker.
    ///
    /// Non-GET requests and non-http(s) URLs are passed through. A failed
    /// cache lookup is treated as a miss.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the worker is not active, or the
    /// network error when a fetch fails and no fallback applies.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let phase = self.phase();
        if phase != Phase::Activated {
            return Err(Error::InvalidState(format!("{} is {phase}, not activated", self.config.generation)));
        }

        if !request.is_get() || !is_fetchable(&request.url) {
            return Ok(FetchOutcome::Passthrough);
        }

        match self.store.match_request(&self.config.generation, request).await {
            Ok(Some(response)) => {
                tracing::debug!("cache hit for {}", request.url);
                return Ok(FetchOutcome::Cache(response));
            }
            Ok(None) => tracing::debug!("cache miss for {}", request.url),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed, using network"),
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                let queued = response.is_cacheable();
                if queued {
                    self.queue_put(request.clone(), response.clone()).await;
                }
                Ok(FetchOutcome::Network { response, queued })
            }
            Err(err) if request.is_navigation() => match self.offline_document().await {
                Some(fallback) => {
                    tracing::debug!(url = %request.url, error = %err, "network failed, serving offline document");
                    Ok(FetchOutcome::Fallback(fallback))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn offline_document(&self) -> Option<Response> {
        let url = match self.config.resolve(&self.config.offline_fallback) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "invalid offline fallback path");
                return None;
            }
        };

        match self.store.match_request(&self.config.generation, &Request::get(url)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "offline fallback lookup failed");
                None
            }
        }
    }

    async fn queue_put(&self, request: Request, response: Response) {
        let store = Arc::clone(&self.store);
        let generation = self.config.generation.clone();

        let mut pending = self.pending.lock().await;
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match store.put(&generation, &request, &response).await {
                Ok(()) => {}
                Err(Error::CacheMiss(_)) => {
                    tracing::debug!(url = %request.url, generation = %generation, "generation evicted, dropping cache write");
                }
                Err(e) => tracing::warn!(url = %request.url, error = %e, "cache write failed"),
            }
        });
    }

    /// Handle a structured message from a page. Returns whether it was
    /// recognised.
    pub fn handle_message(&self, message: &serde_json::Value) -> bool {
        match ControlMessage::decode(message) {
            Some(ControlMessage::SkipWaiting) => {
                self.skip_waiting();
                true
            }
            None => {
                tracing::debug!(%message, "ignoring unknown control message");
                false
            }
        }
    }

    /// Wait for all background cache writes queued so far.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "cache write task did not complete");
            }
        }
    }
}

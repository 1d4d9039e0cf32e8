//! Worker registration for one scope.
//!
//! Tracks the active and waiting workers and the open pages (clients). A
//! page is controlled by the worker that was active when it opened, until a
//! newly activated worker claims it. A waiting worker is promoted when:
//!
//! - there is no active worker
//! - it asked to skip waiting
//! - no open page is controlled by the active worker

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use folio_core::{CacheStorage, Error, Request, Response};

use super::{FetchOutcome, OfflineCacheController, Phase};
use crate::Network;

pub type ClientId = u64;

/// Where a response handed back to a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
    Fallback,
    /// Not intercepted by any worker.
    Passthrough,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Network => "network",
            Source::Fallback => "fallback",
            Source::Passthrough => "passthrough",
        }
    }
}

/// A response delivered to a page.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    /// A copy is being written to the cache in the background.
    pub stored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub generation: String,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationStatus {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    /// Stored generation names, oldest first.
    pub generations: Vec<String>,
    /// Entries in the active generation.
    pub entries: u64,
    pub clients: usize,
    pub controlled_clients: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterOutcome {
    /// This generation is already active or waiting.
    Unchanged,
    /// Installed; waiting for the old worker's pages to close.
    Waiting,
    /// Installed and now controlling every open page.
    Activated,
}

#[derive(Default)]
struct State {
    active: Option<Arc<OfflineCacheController>>,
    waiting: Option<Arc<OfflineCacheController>>,
    /// Open pages and the generation controlling each, if any.
    clients: HashMap<ClientId, Option<String>>,
}

impl State {
    fn active_generation(&self) -> Option<&str> {
        self.active.as_deref().map(OfflineCacheController::generation)
    }

    fn ready_to_promote(&self) -> bool {
        let Some(waiting) = &self.waiting else {
            return false;
        };
        match self.active_generation() {
            None => true,
            Some(active) => {
                waiting.wants_skip_waiting() || !self.clients.values().any(|c| c.as_deref() == Some(active))
            }
        }
    }
}

/// Registration of offline workers for one scope.
pub struct Registration {
    store: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<State>,
    /// Serializes install and activation.
    lifecycle: Mutex<()>,
    next_client: AtomicU64,
}

impl Registration {
    pub fn new(store: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            store,
            network,
            state: RwLock::new(State::default()),
            lifecycle: Mutex::new(()),
            next_client: AtomicU64::new(1),
        }
    }

    /// Install `controller` and activate it when nothing holds it back.
    ///
    /// # Errors
    ///
    /// Returns the install error; the previously active worker keeps serving.
    pub async fn register(&self, controller: OfflineCacheController) -> Result<RegisterOutcome, Error> {
        let _guard = self.lifecycle.lock().await;

        {
            let state = self.state.read().await;
            let known = [state.active.as_ref(), state.waiting.as_ref()]
                .into_iter()
                .flatten()
                .any(|w| w.generation() == controller.generation());
            if known {
                tracing::debug!(generation = controller.generation(), "generation already registered");
                return Ok(RegisterOutcome::Unchanged);
            }
        }

        controller.install().await?;

        let controller = Arc::new(controller);
        if let Some(replaced) = self.state.write().await.waiting.replace(Arc::clone(&controller)) {
            tracing::info!(generation = replaced.generation(), "waiting worker replaced");
            replaced.mark_redundant();
        }

        if self.promote_if_ready().await? {
            Ok(RegisterOutcome::Activated)
        } else {
            tracing::info!(generation = controller.generation(), "worker installed, waiting for open pages to close");
            Ok(RegisterOutcome::Waiting)
        }
    }

    /// Callers must hold the lifecycle lock.
    async fn promote_if_ready(&self) -> Result<bool, Error> {
        let (candidate, outgoing) = {
            let state = self.state.read().await;
            match &state.waiting {
                Some(waiting) if state.ready_to_promote() => (Arc::clone(waiting), state.active.clone()),
                _ => return Ok(false),
            }
        };

        // Writes queued by the outgoing worker land before eviction.
        if let Some(outgoing) = &outgoing {
            outgoing.settle().await;
        }
        candidate.activate().await?;

        let previous = {
            let mut state = self.state.write().await;
            state.waiting = None;
            let generation = candidate.generation().to_string();
            for controller in state.clients.values_mut() {
                *controller = Some(generation.clone());
            }
            let claimed = state.clients.len();
            tracing::info!(generation = %generation, clients = claimed, "worker activated and claimed clients");
            state.active.replace(candidate)
        };

        if let Some(previous) = previous {
            previous.settle().await;
            previous.mark_redundant();
        }

        Ok(true)
    }

    /// Open a page. It is controlled by the active worker, if any.
    pub async fn open_client(&self) -> ClientId {
        let id = self.next_client.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        let controller = state.active_generation().map(str::to_string);
        state.clients.insert(id, controller);
        id
    }

    /// Close a page, promoting the waiting worker if this was the last page
    /// held by the old one. Returns `false` for an unknown id.
    pub async fn close_client(&self, id: ClientId) -> Result<bool, Error> {
        let _guard = self.lifecycle.lock().await;
        if self.state.write().await.clients.remove(&id).is_none() {
            return Ok(false);
        }
        self.promote_if_ready().await?;
        Ok(true)
    }

    /// Deliver a page message to the waiting worker. Returns whether it was
    /// recognised.
    pub async fn post_message(&self, message: &serde_json::Value) -> Result<bool, Error> {
        let _guard = self.lifecycle.lock().await;
        let Some(waiting) = self.state.read().await.waiting.clone() else {
            tracing::debug!(%message, "no waiting worker for message");
            return Ok(false);
        };

        if !waiting.handle_message(message) {
            return Ok(false);
        }
        self.promote_if_ready().await?;
        Ok(true)
    }

    /// Route a request from a page.
    ///
    /// Navigations and requests without a page go to the active worker;
    /// sub-resource requests go to the worker controlling their page.
    /// Uncontrolled traffic goes straight to the network.
    pub async fn fetch(&self, client: Option<ClientId>, request: &Request) -> Result<Served, Error> {
        let controller = {
            let state = self.state.read().await;
            let controlled = match client {
                Some(id) if !request.is_navigation() => {
                    state.clients.get(&id).cloned().flatten().as_deref() == state.active_generation()
                }
                _ => true,
            };
            if controlled { state.active.clone() } else { None }
        };

        let Some(controller) = controller else {
            let response = self.network.fetch(request).await?;
            return Ok(Served { response, source: Source::Passthrough, stored: false });
        };

        let served = match controller.handle_fetch(request).await? {
            FetchOutcome::Cache(response) => Served { response, source: Source::Cache, stored: false },
            FetchOutcome::Network { response, queued } => Served { response, source: Source::Network, stored: queued },
            FetchOutcome::Fallback(response) => Served { response, source: Source::Fallback, stored: false },
            FetchOutcome::Passthrough => {
                let response = self.network.fetch(request).await?;
                Served { response, source: Source::Passthrough, stored: false }
            }
        };
        Ok(served)
    }

    pub async fn active_generation(&self) -> Option<String> {
        self.state.read().await.active_generation().map(str::to_string)
    }

    pub async fn status(&self) -> Result<RegistrationStatus, Error> {
        let (active, waiting, clients, controlled_clients) = {
            let state = self.state.read().await;
            let describe = |w: &Arc<OfflineCacheController>| WorkerStatus {
                generation: w.generation().to_string(),
                phase: w.phase(),
            };
            (
                state.active.as_ref().map(describe),
                state.waiting.as_ref().map(describe),
                state.clients.len(),
                state.clients.values().filter(|c| c.is_some()).count(),
            )
        };

        let generations = self.store.keys().await?;
        let entries = match &active {
            Some(worker) => self.store.entry_count(&worker.generation).await?,
            None => 0,
        };

        Ok(RegistrationStatus { active, waiting, generations, entries, clients, controlled_clients })
    }

    /// Wait for background cache writes of the active and waiting workers.
    pub async fn settle(&self) {
        let workers: Vec<_> = {
            let state = self.state.read().await;
            [state.active.clone(), state.waiting.clone()].into_iter().flatten().collect()
        };
        for worker in workers {
            worker.settle().await;
        }
    }
}

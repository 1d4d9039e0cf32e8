//! Shared state behind the MCP tools.

use std::sync::Arc;

use tokio::sync::RwLock;
use url::Url;

use folio_client::{Network, OfflineCacheController, RegisterOutcome, Registration, WorkerConfig};
use folio_core::{AppConfig, CacheDb, CapabilityController, EnvironmentReader, Error, PreferenceStore};

/// One application scope: the offline shell registration plus the session's
/// capability and appearance state.
pub struct AppState {
    pub config: AppConfig,
    pub origin: Url,
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub registration: Registration,
    pub capability: RwLock<CapabilityController>,
    pub prefs: Arc<dyn PreferenceStore>,
    pub env: Arc<dyn EnvironmentReader>,
}

impl AppState {
    /// Probe the environment and set up an empty registration. Call
    /// [`install_shell`](Self::install_shell) to register the worker.
    pub async fn new(
        config: AppConfig, db: CacheDb, env: Arc<dyn EnvironmentReader>, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let prefs: Arc<dyn PreferenceStore> = Arc::new(db.clone());
        let capability = CapabilityController::start(env.as_ref(), Arc::clone(&prefs), config.thresholds()).await;
        let registration = Registration::new(Arc::new(db.clone()), Arc::clone(&network));

        Ok(Self { config, origin, db, network, registration, capability: RwLock::new(capability), prefs, env })
    }

    /// Register the worker for the configured generation.
    pub async fn install_shell(&self) -> Result<RegisterOutcome, Error> {
        let worker = OfflineCacheController::new(
            WorkerConfig::from_app_config(&self.config)?,
            Arc::new(self.db.clone()),
            Arc::clone(&self.network),
        );
        self.registration.register(worker).await
    }
}

//! The page side of the worker: storage, network and client registry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use swcache_core::{AppConfig, CacheDb, CacheStorage, MemoryStorage, StorageBackend};
use swcache_worker::{CachePolicy, FetchClient, FetchConfig, Network, OfflineWorker, Registration};

/// Everything the tools act on, shared across calls.
pub struct Host {
    pub worker: OfflineWorker,
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub registration: Arc<Registration>,
    pub timeout: Duration,
}

impl Host {
    pub fn new(
        policy: CachePolicy, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, timeout: Duration,
    ) -> Self {
        let registration = Arc::new(Registration::new());
        let worker =
            OfflineWorker::new(policy, Arc::clone(&storage), Arc::clone(&network), registration.clone(), timeout);
        Self { worker, storage, network, registration, timeout }
    }

    /// Open the configured storage backend and build an HTTP-backed host.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let policy = CachePolicy::from_config(config)?;

        let storage: Arc<dyn CacheStorage> = match config.storage {
            StorageBackend::Sqlite => {
                let path = config.require_db_path()?;
                let db = CacheDb::open(path)
                    .await
                    .with_context(|| format!("failed to open cache database at {}", path.display()))?;
                tracing::info!("using sqlite cache at {}", path.display());
                Arc::new(db)
            }
            StorageBackend::Memory => {
                tracing::info!("using in-memory cache");
                Arc::new(MemoryStorage::new())
            }
        };

        let network = Arc::new(FetchClient::new(FetchConfig::from(config))?);

        Ok(Self::new(policy, storage, network, config.timeout()))
    }
}

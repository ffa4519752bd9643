//! Install and activate handling.
//!
//! Install precaches the manifest all-or-nothing: every entry is fetched
//! first, and only if every response is ok are they written. Activate is the
//! only garbage collection there is: every partition whose name is not one
//! of the current pair is deleted.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use serde::Serialize;
use swcache_core::{CacheStorage, Error, Request, Response};

use crate::fetch::{Network, fetch_with_timeout};
use crate::policy::CachePolicy;
use crate::registration::LifecycleHost;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_version: String,
    pub partition: String,
    /// URLs written to the static partition, in manifest order.
    pub precached: Vec<String>,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub claimed_clients: usize,
}

pub struct Lifecycle {
    policy: Arc<CachePolicy>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    host: Arc<dyn LifecycleHost>,
    timeout: Duration,
}

impl Lifecycle {
    pub fn new(
        policy: Arc<CachePolicy>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
        host: Arc<dyn LifecycleHost>, timeout: Duration,
    ) -> Self {
        Self { policy, storage, network, host, timeout }
    }

    /// Precache the manifest into the current static partition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any manifest entry cannot be fetched,
    /// answers with a non-ok status, or cannot be stored. Entries are written
    /// in a single batch, so a failure leaves an existing partition as it was;
    /// a static partition created by this call is removed again.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let partition = self.policy.static_cache();
        let existed = self.storage.has(partition).await.map_err(install_failed)?;

        match self.precache(partition).await {
            Ok(precached) => {
                self.host.skip_waiting().await?;
                tracing::info!(partition, entries = precached.len(), "install complete");
                Ok(InstallReport {
                    cache_version: self.policy.cache_version().to_string(),
                    partition: partition.to_string(),
                    precached,
                })
            }
            Err(e) => {
                if !existed && let Err(cleanup) = self.storage.delete(partition).await {
                    tracing::warn!("failed to remove partial partition {}: {}", partition, cleanup);
                }
                tracing::warn!("install failed, previous version stays active: {}", e);
                Err(e)
            }
        }
    }

    async fn precache(&self, partition: &str) -> Result<Vec<String>, Error> {
        self.storage.open(partition).await.map_err(install_failed)?;

        let requests = self
            .policy
            .manifest()
            .iter()
            .map(|path| self.policy.url_for(path).map(Request::get))
            .collect::<Result<Vec<_>, _>>()
            .map_err(install_failed)?;

        let responses: Vec<Response> = try_join_all(requests.iter().map(|request| async move {
            let response = fetch_with_timeout(self.network.as_ref(), request, self.timeout)
                .await
                .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{} returned status {}", request.url, response.status)));
            }
            Ok(response)
        }))
        .await?;

        let precached = requests.iter().map(|r| r.url.to_string()).collect();
        let entries: Vec<(Request, Response)> = requests.into_iter().zip(responses).collect();
        self.storage.put_all(partition, &entries).await.map_err(install_failed)?;

        Ok(precached)
    }

    /// Delete stale partitions and claim open clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let (kept, stale): (Vec<String>, Vec<String>) = self
            .storage
            .keys()
            .await?
            .into_iter()
            .partition(|name| self.policy.is_current_partition(name));

        try_join_all(stale.iter().map(|name| async move {
            self.storage.delete(name).await?;
            tracing::info!(partition = %name, "deleted stale cache partition");
            Ok::<_, Error>(())
        }))
        .await?;

        let claimed_clients = self.host.claim_clients().await?;
        tracing::info!(deleted = stale.len(), claimed_clients, "activation complete");

        Ok(ActivateReport { deleted: stale, kept, claimed_clients })
    }
}

fn install_failed(err: Error) -> Error {
    match err {
        Error::InstallFailed(_) => err,
        other => Error::InstallFailed(other.to_string()),
    }
}

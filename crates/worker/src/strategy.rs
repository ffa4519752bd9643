//! Per-class response strategies.
//!
//! | Class      | Lookup            | On miss                           | Network failure           |
//! |------------|-------------------|-----------------------------------|---------------------------|
//! | Precached  | any partition     | network, not stored               | error                     |
//! | BuildAsset | static partition  | network, stored in static if 200  | error                     |
//! | Image      | dynamic partition | network, stored in dynamic if 200 | SVG placeholder           |
//! | Navigation | none              | network first                     | cached fallback page, 503 |
//! | Other      | any partition     | network, not stored               | error                     |
//!
//! Every step is awaited in order: lookup, fetch, write-back, respond. A
//! failed write-back or lookup is logged and never changes the response.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use swcache_core::{CacheStorage, Error, Request, Response};

use crate::classify::ResourceClass;
use crate::fallback::{image_placeholder, offline_response};
use crate::fetch::{Network, fetch_with_timeout};
use crate::policy::CachePolicy;

/// Where an intercepted response came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Cache { partition: String },
    Network,
    /// Generated placeholder for an unreachable image.
    Placeholder,
    /// Cached fallback page for an offline navigation.
    CachedFallback { partition: String },
    /// Generated 503 for an offline navigation.
    Offline,
}

/// A response produced by the worker.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub class: ResourceClass,
    pub source: Source,
    pub response: Response,
}

/// Applies the strategy for each resource class.
pub struct Strategies {
    policy: Arc<CachePolicy>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    timeout: Duration,
}

impl Strategies {
    pub fn new(
        policy: Arc<CachePolicy>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, timeout: Duration,
    ) -> Self {
        Self { policy, storage, network, timeout }
    }

    /// Produce a response for a classified request.
    ///
    /// Errors are network failures the class does not recover from.
    pub async fn respond(&self, class: ResourceClass, request: &Request) -> Result<Outcome, Error> {
        match class {
            ResourceClass::Precached | ResourceClass::Other => self.cache_first(class, request).await,
            ResourceClass::BuildAsset => self.cache_first_populate(class, self.policy.static_cache(), request).await,
            ResourceClass::Image => self.image(request).await,
            ResourceClass::Navigation => Ok(self.network_first(request).await),
        }
    }

    /// Any partition, then the network with no write-back.
    async fn cache_first(&self, class: ResourceClass, request: &Request) -> Result<Outcome, Error> {
        if let Some((partition, response)) = self.lookup_any(request).await {
            return Ok(Outcome { class, source: Source::Cache { partition }, response });
        }

        let response = self.fetch(request).await?;
        Ok(Outcome { class, source: Source::Network, response })
    }

    /// One partition, then the network, storing a copy of exact-200 responses.
    async fn cache_first_populate(
        &self, class: ResourceClass, partition: &str, request: &Request,
    ) -> Result<Outcome, Error> {
        if let Some(response) = self.lookup_in(partition, request).await {
            return Ok(Outcome { class, source: Source::Cache { partition: partition.to_string() }, response });
        }

        let response = self.fetch(request).await?;
        if response.status == 200 {
            self.store(partition, request, &response).await;
        }
        Ok(Outcome { class, source: Source::Network, response })
    }

    /// Dynamic partition with write-back; a placeholder if the network fails.
    async fn image(&self, request: &Request) -> Result<Outcome, Error> {
        let partition = self.policy.dynamic_cache();
        match self.cache_first_populate(ResourceClass::Image, partition, request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!("image fetch failed for {}, serving placeholder: {}", request.url, e);
                Ok(Outcome { class: ResourceClass::Image, source: Source::Placeholder, response: image_placeholder() })
            }
        }
    }

    /// Network, then the cached fallback page, then a synthetic 503.
    async fn network_first(&self, request: &Request) -> Outcome {
        let class = ResourceClass::Navigation;
        let error = match self.fetch(request).await {
            Ok(response) => return Outcome { class, source: Source::Network, response },
            Err(e) => e,
        };

        tracing::warn!("navigation to {} failed, trying offline fallback: {}", request.url, error);

        match self.policy.offline_fallback_url() {
            Ok(url) => {
                if let Some((partition, response)) = self.lookup_any(&Request::get(url)).await {
                    return Outcome { class, source: Source::CachedFallback { partition }, response };
                }
            }
            Err(e) => tracing::warn!("offline fallback path is unusable: {}", e),
        }

        Outcome { class, source: Source::Offline, response: offline_response() }
    }

    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        fetch_with_timeout(self.network.as_ref(), request, self.timeout).await
    }

    async fn lookup_any(&self, request: &Request) -> Option<(String, Response)> {
        match self.storage.match_any(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache lookup failed for {}, treating as miss: {}", request.url, e);
                None
            }
        }
    }

    async fn lookup_in(&self, partition: &str, request: &Request) -> Option<Response> {
        match self.storage.match_in(partition, request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache lookup in {} failed for {}, treating as miss: {}", partition, request.url, e);
                None
            }
        }
    }

    /// Best-effort write-back; failures are logged and dropped.
    async fn store(&self, partition: &str, request: &Request, response: &Response) {
        if let Err(e) = self.storage.put(partition, request, response).await {
            tracing::warn!("failed to cache {} in {}: {}", request.url, partition, e);
            return;
        }
        tracing::debug!("cached {} in {}", request.url, partition);

        if partition == self.policy.dynamic_cache()
            && let Some(max_entries) = self.policy.dynamic_max_entries()
        {
            match self.storage.trim(partition, max_entries).await {
                Ok(0) => {}
                Ok(evicted) => tracing::debug!(evicted, partition, "trimmed dynamic partition"),
                Err(e) => tracing::warn!("failed to trim {}: {}", partition, e),
            }
        }
    }
}

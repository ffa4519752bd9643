//! Immutable cache policy shared by the classifier, strategies and lifecycle.
//!
//! One value per worker instance; nothing here changes after construction.

use std::collections::HashSet;

use swcache_core::{AppConfig, Error};
use url::Url;

use crate::fetch::{normalize_path, resolve, same_origin};

/// Versioned partition names, precache manifest and routing prefixes.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    origin: Url,
    cache_version: String,
    static_cache: String,
    dynamic_cache: String,
    /// Manifest paths in declaration order, as requested at install time.
    manifest: Vec<String>,
    /// Normalized manifest paths for classification.
    manifest_index: HashSet<String>,
    build_asset_prefix: String,
    offline_fallback_path: String,
    dynamic_max_entries: Option<usize>,
}

impl CachePolicy {
    /// Build a policy for `origin` with the default portfolio layout.
    pub fn new(origin: &str) -> Result<Self, Error> {
        let config = AppConfig { origin: origin.to_string(), ..Default::default() };
        Self::from_config(&config)
    }

    /// Build a policy from loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;

        let mut manifest = Vec::with_capacity(config.static_assets.len());
        let mut manifest_index = HashSet::with_capacity(config.static_assets.len());
        for path in &config.static_assets {
            let normalized = site_path(&origin, path)?;
            if manifest_index.insert(normalized) {
                manifest.push(path.clone());
            }
        }

        site_path(&origin, &config.offline_fallback_path)?;

        Ok(Self {
            origin,
            cache_version: config.cache_version.clone(),
            static_cache: config.static_cache.clone(),
            dynamic_cache: config.dynamic_cache.clone(),
            manifest,
            manifest_index,
            build_asset_prefix: config.build_asset_prefix.clone(),
            offline_fallback_path: config.offline_fallback_path.clone(),
            dynamic_max_entries: config.dynamic_max_entries,
        })
    }

    /// Replace the precache manifest.
    pub fn with_manifest<I, S>(mut self, paths: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest.clear();
        self.manifest_index.clear();
        for path in paths {
            let path = path.into();
            let normalized = site_path(&self.origin, &path)?;
            if self.manifest_index.insert(normalized) {
                self.manifest.push(path);
            }
        }
        Ok(self)
    }

    /// Use a different pair of partition names (a new deploy).
    pub fn with_partitions(mut self, static_cache: &str, dynamic_cache: &str) -> Self {
        self.static_cache = static_cache.to_string();
        self.dynamic_cache = dynamic_cache.to_string();
        self
    }

    /// Bound the dynamic partition.
    pub fn with_dynamic_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.dynamic_max_entries = max_entries;
        self
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn cache_version(&self) -> &str {
        &self.cache_version
    }

    pub fn static_cache(&self) -> &str {
        &self.static_cache
    }

    pub fn dynamic_cache(&self) -> &str {
        &self.dynamic_cache
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    pub fn build_asset_prefix(&self) -> &str {
        &self.build_asset_prefix
    }

    pub fn dynamic_max_entries(&self) -> Option<usize> {
        self.dynamic_max_entries
    }

    /// Whether a normalized URL path is in the precache manifest.
    pub fn is_precached_path(&self, path: &str) -> bool {
        self.manifest_index.contains(path)
    }

    /// Whether a partition name belongs to the current version.
    pub fn is_current_partition(&self, name: &str) -> bool {
        name == self.static_cache || name == self.dynamic_cache
    }

    /// Resolve a site path against the origin.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    /// URL of the page served to offline navigations.
    pub fn offline_fallback_url(&self) -> Result<Url, Error> {
        self.url_for(&self.offline_fallback_path)
    }
}

/// Normalized path of `path`, which must stay on `origin`.
fn site_path(origin: &Url, path: &str) -> Result<String, Error> {
    let url = resolve(origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
    if !same_origin(origin, &url) {
        return Err(Error::InvalidUrl(format!("{path} resolves off-origin to {url}")));
    }
    normalize_path(origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
}

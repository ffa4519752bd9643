//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not a bare http(s) origin
    /// - a partition name is empty, or the static and dynamic names collide
    /// - a manifest path, the build prefix or the fallback path is not absolute
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `dynamic_max_entries` is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.path() != "/" || origin.query().is_some() || origin.fragment().is_some() {
            return Err(invalid("origin", "must not carry a path, query or fragment"));
        }

        for (field, value) in
            [("cache_version", &self.cache_version), ("static_cache", &self.static_cache), ("dynamic_cache", &self.dynamic_cache)]
        {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        if self.static_cache == self.dynamic_cache {
            return Err(invalid("dynamic_cache", "must differ from static_cache"));
        }

        if let Some(path) = self.static_assets.iter().find(|p| !is_site_path(p)) {
            return Err(invalid("static_assets", format!("{path} must be a site path starting with a single '/'")));
        }
        if !is_site_path(&self.build_asset_prefix) {
            return Err(invalid("build_asset_prefix", "must be a site path starting with a single '/'"));
        }
        if !is_site_path(&self.offline_fallback_path) {
            return Err(invalid("offline_fallback_path", "must be a site path starting with a single '/'"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.dynamic_max_entries == Some(0) {
            return Err(invalid("dynamic_max_entries", "must be greater than 0 when set"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.static_assets.contains(&self.offline_fallback_path) {
            tracing::warn!(
                fallback = %self.offline_fallback_path,
                "offline_fallback_path is not precached; offline navigations \
                 will only find it if an earlier fetch stored it"
            );
        }

        Ok(())
    }
}
/// A path on the configured origin: one leading slash, never `//host` or `/\host`.
/// A path on the configured origin: one leading slash, never `//host` or `/\\host`.
fn is_site_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

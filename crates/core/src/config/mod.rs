//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The cache generation and partition names are the versioning surface:
//! bumping them on deploy is what makes activation purge old partitions.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Where cache partitions are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The single origin the worker serves, e.g. `https://example.dev`.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Overall cache generation identifier.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Name of the current static partition.
    ///
    /// Set via SWCACHE_STATIC_CACHE environment variable.
    #[serde(default = "default_static_cache")]
    pub static_cache: String,

    /// Name of the current dynamic partition.
    ///
    /// Set via SWCACHE_DYNAMIC_CACHE environment variable.
    #[serde(default = "default_dynamic_cache")]
    pub dynamic_cache: String,

    /// Paths precached at install time.
    ///
    /// Set via SWCACHE_STATIC_ASSETS environment variable.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path prefix of content-hashed build output.
    ///
    /// Set via SWCACHE_BUILD_ASSET_PREFIX environment variable.
    #[serde(default = "default_build_asset_prefix")]
    pub build_asset_prefix: String,

    /// Cached page served when a navigation cannot reach the network.
    ///
    /// Set via SWCACHE_OFFLINE_FALLBACK_PATH environment variable.
    #[serde(default = "default_offline_fallback_path")]
    pub offline_fallback_path: String,

    /// Upper bound on entries in the dynamic partition; unbounded when unset.
    ///
    /// Set via SWCACHE_DYNAMIC_MAX_ENTRIES environment variable.
    #[serde(default)]
    pub dynamic_max_entries: Option<usize>,

    /// Partition storage backend.
    ///
    /// Set via SWCACHE_STORAGE environment variable.
    #[serde(default)]
    pub storage: StorageBackend,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network timeout in milliseconds; expiry counts as a network failure.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_version() -> String {
    "portfolio-v1".into()
}

fn default_static_cache() -> String {
    "static-v1".into()
}

fn default_dynamic_cache() -> String {
    "dynamic-v1".into()
}

fn default_static_assets() -> Vec<String> {
    ["/", "/favicon.ico", "/favicon.svg", "/og-image.jpg", "/manifest.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_build_asset_prefix() -> String {
    "/_next/".into()
}

fn default_offline_fallback_path() -> String {
    "/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_version: default_cache_version(),
            static_cache: default_static_cache(),
            dynamic_cache: default_dynamic_cache(),
            static_assets: default_static_assets(),
            build_asset_prefix: default_build_asset_prefix(),
            offline_fallback_path: default_offline_fallback_path(),
            dynamic_max_entries: None,
            storage: StorageBackend::Sqlite,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Database path, required only by the SQLite backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the path is empty.
    pub fn require_db_path(&self) -> Result<&PathBuf, ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set SWCACHE_DB_PATH or SWCACHE_STORAGE=memory".into(),
            });
        }
        Ok(&self.db_path)
    }
}

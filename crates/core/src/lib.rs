//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response model shared by the worker and the host harness
//! - Cache partition storage with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CacheDb, CacheStorage, MemoryStorage, StoredEntry};
pub use config::{AppConfig, ConfigError, StorageBackend};
pub use error::Error;
pub use request::{Destination, Method, Request, RequestMode, Response};

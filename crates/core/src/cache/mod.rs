//! Named cache partitions mapping request identity to stored responses.
//!
//! This module provides the partition store the offline worker reads and
//! writes through. Two backends implement [`CacheStorage`]:
//!
//! - [`CacheDb`]: durable SQLite storage with async access via tokio-rusqlite
//! - [`MemoryStorage`]: in-process storage with an optional byte quota
//!
//! Entries are keyed by a SHA-256 of method and fragment-less URL, so a
//! second put for the same request replaces the first.

pub mod connection;
pub mod entries;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod partitions;

use async_trait::async_trait;

pub use crate::Error;
use crate::{Request, Response};

pub use connection::CacheDb;
pub use entries::StoredEntry;
pub use memory::MemoryStorage;

/// A store of named cache partitions.
///
/// Implementations must be safe to share between concurrently handled
/// requests. Concurrent puts under the same key resolve last-write-wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a partition, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Whether a partition with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// All partition names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if no such partition existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Store a response under the request's key, creating the partition if needed.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store several responses as one write: all of them or none.
    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error>;

    /// Look a request up in one partition.
    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look a request up in every partition, oldest partition first.
    ///
    /// Returns the name of the partition that answered alongside the response.
    async fn match_any(&self, request: &Request) -> Result<Option<(String, Response)>, Error>;

    /// Number of entries in a partition (0 if it does not exist).
    async fn entry_count(&self, name: &str) -> Result<usize, Error>;

    /// Evict the oldest-stored entries until at most `max_entries` remain.
    ///
    /// Returns the number of evicted entries.
    async fn trim(&self, name: &str, max_entries: usize) -> Result<u64, Error>;
}

/// Reject requests the cache must never store.
pub(crate) fn ensure_cacheable(request: &Request) -> Result<(), Error> {
    if request.method != crate::Method::Get {
        return Err(Error::InvalidInput(format!("cannot cache {} request for {}", request.method, request.url)));
    }
    Ok(())
}

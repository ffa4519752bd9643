//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode, cascading deletes), and running
//! migrations. It also wires [`CacheDb`] into the [`CacheStorage`] trait.

use super::{CacheStorage, migrations};
use crate::{Error, Request, Response};
use async_trait::async_trait;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.open_partition(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.has_partition(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.partition_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_partition(name).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        self.put_entries(name, entries).await
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        Ok(self.get_entry(name, request).await?.map(|e| e.into_response()))
    }

    async fn match_any(&self, request: &Request) -> Result<Option<(String, Response)>, Error> {
        Ok(self
            .find_entry(request)
            .await?
            .map(|e| (e.partition.clone(), e.into_response())))
    }

    async fn entry_count(&self, name: &str) -> Result<usize, Error> {
        self.count_entries(name).await
    }

    async fn trim(&self, name: &str, max_entries: usize) -> Result<u64, Error> {
        self.trim_entries(name, max_entries).await
    }
}

//! Stored entry operations for the SQLite backend.
//!
//! Entries are immutable snapshots of a response. Refreshing an entry means
//! replacing the row under the same key, never editing it in place.

use super::connection::CacheDb;
use super::ensure_cacheable;
use super::key::request_key;
use super::partitions::partition_id;
use crate::{Error, Request, Response};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A response snapshot stored in a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredEntry {
    pub partition: String,
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredEntry {
    /// Snapshot a response for storage under `partition`.
    pub fn capture(partition: &str, request: &Request, response: &Response) -> Self {
        Self {
            partition: partition.to_string(),
            key: request_key(request),
            method: request.method.to_string(),
            url: request.cache_url(),
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    pub fn into_response(self) -> Response {
        Response::new(self.status, self.headers, self.body)
    }
}

const ENTRY_COLUMNS: &str = "p.name, e.key, e.method, e.url, e.status, e.headers_json, e.body, e.stored_at";

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StoredEntry, String)> {
    let entry = StoredEntry {
        partition: row.get(0)?,
        key: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        status: row.get(4)?,
        headers: Vec::new(),
        body: row.get(6)?,
        stored_at: row.get(7)?,
    };
    Ok((entry, row.get(5)?))
}

fn decode(row: (StoredEntry, String)) -> Result<StoredEntry, Error> {
    let (mut entry, headers_json) = row;
    entry.headers = serde_json::from_str(&headers_json)?;
    Ok(entry)
}

impl CacheDb {
    /// Insert or replace the entry for a request in a partition.
    ///
    /// Creates the partition if needed. Only GET requests are accepted.
    pub async fn put_entry(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entries(partition, &[(request.clone(), response.clone())]).await
    }

    /// Insert or replace several entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, partition: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let mut rows = Vec::with_capacity(entries.len());
        for (request, response) in entries {
            ensure_cacheable(request)?;
            let entry = StoredEntry::capture(partition, request, response);
            let headers_json = serde_json::to_string(&entry.headers)?;
            rows.push((entry, headers_json));
        }
        let partition = partition.to_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let id = partition_id(&tx, &partition, true)?
                    .ok_or_else(|| Error::InvalidInput(format!("partition {partition} vanished")))?;
                for (entry, headers_json) in &rows {
                    tx.execute(
                        "INSERT OR REPLACE INTO entries (
                            partition_id, key, method, url, status, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        params![
                            id,
                            &entry.key,
                            &entry.method,
                            &entry.url,
                            entry.status,
                            headers_json,
                            &entry.body,
                            &entry.stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for a request from one partition.
    pub async fn get_entry(&self, partition: &str, request: &Request) -> Result<Option<StoredEntry>, Error> {
        let partition = partition.to_string();
        let key = request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS}
                    FROM entries e JOIN partitions p ON p.id = e.partition_id
                    WHERE p.name = ?1 AND e.key = ?2"
                ))?;

                match stmt.query_row(params![partition, key], read_entry) {
                    Ok(row) => Ok(Some(decode(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Find the entry for a request in any partition, oldest partition first.
    pub async fn find_entry(&self, request: &Request) -> Result<Option<StoredEntry>, Error> {
        let key = request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS}
                    FROM entries e JOIN partitions p ON p.id = e.partition_id
                    WHERE e.key = ?1
                    ORDER BY p.id ASC LIMIT 1"
                ))?;

                match stmt.query_row(params![key], read_entry) {
                    Ok(row) => Ok(Some(decode(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Count the entries in a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<usize, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries e JOIN partitions p ON p.id = e.partition_id WHERE p.name = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest-stored entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_entries(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let Some(id) = partition_id(conn, &partition, false)? else {
                    return Ok(0);
                };

                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition_id = ?1", params![id], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE rowid IN (
                    SELECT rowid FROM entries WHERE partition_id = ?1
                    ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                )",
                    params![id, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

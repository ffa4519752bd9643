//! In-process partition store.
//!
//! Uses a tokio RwLock over an ordered list of partitions. An optional quota
//! caps the total body bytes held across all partitions; a put that would
//! exceed it fails without changing anything.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::key::request_key;
use super::{CacheStorage, StoredEntry, ensure_cacheable};
use crate::{Error, Request, Response};

#[derive(Debug, Default)]
struct Partition {
    name: String,
    /// key -> (write sequence, entry)
    entries: HashMap<String, (u64, StoredEntry)>,
}

impl Partition {
    fn bytes(&self) -> usize {
        self.entries.values().map(|(_, e)| e.body.len()).sum()
    }
}

#[derive(Debug, Default)]
struct Inner {
    partitions: Vec<Partition>,
    used_bytes: usize,
    next_seq: u64,
}

impl Inner {
    fn find(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Partition> {
        self.partitions.iter_mut().find(|p| p.name == name)
    }

    fn open(&mut self, name: &str) -> &mut Partition {
        let idx = match self.partitions.iter().position(|p| p.name == name) {
            Some(idx) => idx,
            None => {
                self.partitions.push(Partition { name: name.to_string(), entries: HashMap::new() });
                self.partitions.len() - 1
            }
        };
        &mut self.partitions[idx]
    }
}

/// Partition store held in memory.
///
/// Cloning shares the underlying partitions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once `quota_bytes` of bodies are held.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self { inner: Arc::default(), quota_bytes: Some(quota_bytes) }
    }

    /// Total body bytes currently stored.
    pub async fn used_bytes(&self) -> usize {
        self.inner.read().await.used_bytes
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.write().await.open(name);
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.inner.read().await.find(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.partitions.iter().map(|p| p.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        let Some(idx) = inner.partitions.iter().position(|p| p.name == name) else {
            return Ok(false);
        };
        let removed = inner.partitions.remove(idx);
        inner.used_bytes = inner.used_bytes.saturating_sub(removed.bytes());
        Ok(true)
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_all(name, &[(request.clone(), response.clone())]).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let mut batch: HashMap<String, StoredEntry> = HashMap::with_capacity(entries.len());
        for (request, response) in entries {
            ensure_cacheable(request)?;
            let entry = StoredEntry::capture(name, request, response);
            batch.insert(entry.key.clone(), entry);
        }

        let mut inner = self.inner.write().await;
        let replaced: usize = inner.find(name).map_or(0, |p| {
            batch
                .keys()
                .filter_map(|key| p.entries.get(key))
                .map(|(_, e)| e.body.len())
                .sum()
        });
        let added: usize = batch.values().map(|e| e.body.len()).sum();
        let projected = inner.used_bytes - replaced + added;
        if let Some(quota) = self.quota_bytes
            && projected > quota
        {
            let urls: Vec<&str> = batch.values().map(|e| e.url.as_str()).collect();
            return Err(Error::QuotaExceeded(format!(
                "storing {} would use {projected} of {quota} bytes",
                urls.join(", ")
            )));
        }

        inner.used_bytes = projected;
        inner.open(name);
        for (request, _) in entries {
            let key = request_key(request);
            if let Some(entry) = batch.remove(&key) {
                inner.next_seq += 1;
                let seq = inner.next_seq;
                inner.open(name).entries.insert(key, (seq, entry));
            }
        }
        Ok(())
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let key = request_key(request);
        let inner = self.inner.read().await;
        Ok(inner
            .find(name)
            .and_then(|p| p.entries.get(&key))
            .map(|(_, e)| e.clone().into_response()))
    }

    async fn match_any(&self, request: &Request) -> Result<Option<(String, Response)>, Error> {
        let key = request_key(request);
        let inner = self.inner.read().await;
        Ok(inner.partitions.iter().find_map(|p| {
            p.entries
                .get(&key)
                .map(|(_, e)| (p.name.clone(), e.clone().into_response()))
        }))
    }

    async fn entry_count(&self, name: &str) -> Result<usize, Error> {
        Ok(self.inner.read().await.find(name).map_or(0, |p| p.entries.len()))
    }

    async fn trim(&self, name: &str, max_entries: usize) -> Result<u64, Error> {
        let mut inner = self.inner.write().await;
        let Some(partition) = inner.find_mut(name) else {
            return Ok(0);
        };
        if partition.entries.len() <= max_entries {
            return Ok(0);
        }

        let mut by_age: Vec<(u64, String)> = partition
            .entries
            .iter()
            .map(|(key, (seq, _))| (*seq, key.clone()))
            .collect();
        by_age.sort_unstable();

        let excess = partition.entries.len() - max_entries;
        let mut freed = 0;
        for (_, key) in by_age.into_iter().take(excess) {
            if let Some((_, entry)) = partition.entries.remove(&key) {
                freed += entry.body.len();
            }
        }
        inner.used_bytes = inner.used_bytes.saturating_sub(freed);
        Ok(excess as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(path: &str) -> Request {
        Request::get(Url::parse("https://portfolio.test").unwrap().join(path).unwrap())
    }

    fn body(bytes: &str) -> Response {
        Response::with_content_type(200, "application/octet-stream", bytes.to_string())
    }

    #[tokio::test]
    async fn test_put_creates_partition() {
        let store = MemoryStorage::new();
        store.put("dynamic-v1", &get("/me.png"), &body("png")).await.unwrap();

        assert!(store.has("dynamic-v1").await.unwrap());
        let hit = store.match_in("dynamic-v1", &get("/me.png")).await.unwrap();
        assert_eq!(hit.unwrap().text(), "png");
    }

    #[tokio::test]
    async fn test_same_key_overwrites() {
        let store = MemoryStorage::new();
        store.put("static-v1", &get("/"), &body("one")).await.unwrap();
        store.put("static-v1", &get("/"), &body("three")).await.unwrap();

        assert_eq!(store.entry_count("static-v1").await.unwrap(), 1);
        assert_eq!(store.used_bytes().await, 5);
        let hit = store.match_in("static-v1", &get("/")).await.unwrap().unwrap();
        assert_eq!(hit.text(), "three");
    }

    #[tokio::test]
    async fn test_quota_rejects_without_side_effects() {
        let store = MemoryStorage::with_quota(4);
        store.put("dynamic-v1", &get("/a.png"), &body("abc")).await.unwrap();

        let result = store.put("dynamic-v1", &get("/b.png"), &body("de")).await;
        assert!(matches!(result, Err(Error::QuotaExceeded(_))));
        assert_eq!(store.entry_count("dynamic-v1").await.unwrap(), 1);
        assert_eq!(store.used_bytes().await, 3);
    }

    #[tokio::test]
    async fn test_match_any_searches_in_creation_order() {
        let store = MemoryStorage::new();
        store.put("static-v1", &get("/"), &body("static")).await.unwrap();
        store.put("dynamic-v1", &get("/"), &body("dynamic")).await.unwrap();

        let (partition, hit) = store.match_any(&get("/")).await.unwrap().unwrap();
        assert_eq!(partition, "static-v1");
        assert_eq!(hit.text(), "static");
        assert!(store.match_any(&get("/missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_releases_bytes() {
        let store = MemoryStorage::new();
        store.put("dynamic-v0", &get("/old.png"), &body("old")).await.unwrap();

        assert!(store.delete("dynamic-v0").await.unwrap());
        assert!(!store.delete("dynamic-v0").await.unwrap());
        assert_eq!(store.used_bytes().await, 0);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trim_keeps_newest() {
        let store = MemoryStorage::new();
        for path in ["/1.png", "/2.png", "/3.png"] {
            store.put("dynamic-v1", &get(path), &body("x")).await.unwrap();
        }

        assert_eq!(store.trim("dynamic-v1", 1).await.unwrap(), 2);
        assert!(store.match_in("dynamic-v1", &get("/3.png")).await.unwrap().is_some());
        assert!(store.match_in("dynamic-v1", &get("/1.png")).await.unwrap().is_none());
        assert_eq!(store.used_bytes().await, 1);
    }

    #[tokio::test]
    async fn test_put_all_over_quota_keeps_existing_entries() {
        let store = MemoryStorage::with_quota(10);
        store.put("static-v1", &get("/"), &body("old")).await.unwrap();

        let batch = vec![(get("/"), body("new")), (get("/favicon.ico"), body("a twenty byte favico"))];
        let result = store.put_all("static-v1", &batch).await;

        assert!(matches!(result, Err(Error::QuotaExceeded(_))));
        assert_eq!(store.match_in("static-v1", &get("/")).await.unwrap().unwrap().text(), "old");
        assert!(store.match_in("static-v1", &get("/favicon.ico")).await.unwrap().is_none());
        assert_eq!(store.used_bytes().await, 3);
    }

    #[tokio::test]
    async fn test_put_all_replaces_within_quota() {
        let store = MemoryStorage::with_quota(8);
        store.put("static-v1", &get("/"), &body("old")).await.unwrap();

        let batch = vec![(get("/"), body("new!")), (get("/a"), body("abcd"))];
        store.put_all("static-v1", &batch).await.unwrap();
        assert_eq!(store.used_bytes().await, 8);
        assert_eq!(store.entry_count("static-v1").await.unwrap(), 2);
    }
}

//! Process-local cache store

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

use super::{CacheError, CacheStore};

/// A cached payload and the instant it stops being fresh
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Bytes,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory [`CacheStore`] shared by all requests of the process
///
/// Entries are replaced whole under the write lock, so readers never see a
/// partially written payload.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: Option<usize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of entries; the entry closest to expiry is evicted first
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: Some(max_entries.max(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(|_| CacheError::Poisoned("get"))?;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => return Ok(Some(entry.payload.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless another request refreshed it meanwhile
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Poisoned("expire"))?;
        if entries.get(key).is_some_and(|entry| !entry.is_fresh(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or(CacheError::InvalidTtl(ttl))?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Poisoned("put"))?;

        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(key) {
                entries.retain(|_, entry| entry.is_fresh(now));
            }
            if entries.len() >= max && !entries.contains_key(key) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(key = %oldest, "Evicting cache entry");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                payload: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Poisoned("purge"))?;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_fresh(now));
        Ok(before - entries.len())
    }
}

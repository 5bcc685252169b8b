//! Read-through caching for content-store responses and rendered pages
//!
//! Cache failures never fail a request: a broken store is logged and the
//! producer runs uncached. Only produced payloads are stored; "not found"
//! results are always recomputed.

mod memory;

pub use memory::MemoryCache;

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache lock poisoned during {0}")]
    Poisoned(&'static str),
    #[error("ttl of {0:?} is out of range")]
    InvalidTtl(Duration),
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value storage with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fresh payload for `key`; expired entries are never returned
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store a complete payload for `ttl`
    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Drop expired entries, returning how many were removed
    ///
    /// Stores that expire entries on their own can keep the default.
    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// Where a payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Cache disabled or unavailable
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
        }
    }
}

/// A payload together with its cache status
#[derive(Debug, Clone)]
pub struct Cached {
    pub payload: Bytes,
    pub status: CacheStatus,
}

/// Read-through wrapper around an optional [`CacheStore`]
#[derive(Clone, Default)]
pub struct ReadThrough {
    store: Option<Arc<dyn CacheStore>>,
}

impl ReadThrough {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A wrapper that always calls the producer
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Drop expired entries from the store; failures are logged, not returned
    pub async fn purge_expired(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        match store.purge_expired().await {
            Ok(purged) => {
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired cache entries");
                }
                purged
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cache purge failed");
                0
            }
        }
    }

    /// Return the fresh payload for `key`, or run `produce` and cache its result
    pub async fn get_or_produce<F, Fut>(&self, key: &str, ttl: Duration, produce: F) -> Option<Cached>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Bytes>>,
    {
        let Some(store) = &self.store else {
            return produce().await.map(|payload| Cached {
                payload,
                status: CacheStatus::Bypass,
            });
        };

        let mut status = CacheStatus::Miss;
        match store.get(key).await {
            Ok(Some(payload)) => {
                tracing::debug!(key, outcome = "hit", "Cache lookup");
                return Some(Cached {
                    payload,
                    status: CacheStatus::Hit,
                });
            }
            Ok(None) => tracing::debug!(key, outcome = "miss", "Cache lookup"),
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, bypassing");
                status = CacheStatus::Bypass;
            }
        }

        let payload = produce().await?;

        if status == CacheStatus::Miss {
            if let Err(e) = store.put(key, payload.clone(), ttl).await {
                tracing::warn!(key, error = %e, "Cache write failed");
            }
        }

        Some(Cached { payload, status })
    }
}

/// Purge expired entries every `period` until the returned task is aborted
///
/// Returns `None` for a disabled cache.
pub fn spawn_sweep(cache: ReadThrough, period: Duration) -> Option<JoinHandle<()>> {
    if !cache.is_enabled() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            cache.purge_expired().await;
        }
    }))
}

/// Cache key for a raw document
pub fn document_key(path: &str) -> String {
    format!("doc:{}", path)
}

/// Cache key for a directory listing
pub fn listing_key(path: &str) -> String {
    format!("dir:{}", path)
}

/// Cache key for a whole rendered page
pub fn page_key(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("page:{}?{}", path, query),
        _ => format!("page:{}", path),
    }
}

//! In-process TTL store backed by a concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::cache::store::{CacheStore, StoreError};
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A thread-safe cache with per-entry expiry.
///
/// Expired entries are invisible to `get` and removed lazily on access;
/// `purge_expired` (or the sweeper task) reclaims the rest.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Periodically purge expired entries until shutdown.
    pub async fn run_sweeper(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Cache sweeper starting");

        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Purged expired cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        let value = match self.inner.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };

        // Entry exists but has expired. The read guard above is released
        // before removal, otherwise the shard lock would deadlock.
        self.inner.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StoreError::Unavailable(format!("ttl {ttl:?} out of range")))?;
        self.inner.insert(key.to_string(), Entry { value, expires_at });
        metrics::record_cache_size(self.inner.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", b"v1".to_vec(), Duration::from_secs(4)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v1".to_vec()));

        store.set("k", b"v2".to_vec(), Duration::from_secs(4)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_absent_at_ttl() {
        let store = MemoryStore::new();
        store.set("k", b"v".to_vec(), Duration::from_secs(4)).await.unwrap();

        time::advance(Duration::from_millis(3999)).await;
        assert!(store.get("k").await.unwrap().is_some());

        time::advance(Duration::from_millis(1)).await;
        assert!(store.get("k").await.unwrap().is_none());
        // Lazily removed on the read above.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_rejected() {
        let store = MemoryStore::new();
        let err = store.set("k", b"v".to_vec(), Duration::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store.set("short", b"a".to_vec(), Duration::from_secs(1)).await.unwrap();
        store.set("long", b"b".to_vec(), Duration::from_secs(60)).await.unwrap();

        time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_shutdown() {
        let store = MemoryStore::new();
        store.set("k", b"v".to_vec(), Duration::from_secs(1)).await.unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(store.clone().run_sweeper(Duration::from_secs(5), rx));

        time::sleep(Duration::from_secs(6)).await;
        assert!(store.is_empty());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}

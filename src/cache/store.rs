//! Backing stores for cached entries.
//!
//! The orchestrator only needs opaque bytes with an optional TTL. Adapters for
//! clients that hand values back as strings convert them to [`Bytes`] before
//! returning from [`CacheStore::get`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::trace;

use super::error::StoreError;

/// Key/value store holding encoded entries.
///
/// Implementations must tolerate concurrent calls from many request tasks.
/// No read-after-write guarantee is assumed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Stores `value` without expiry.
    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Stores `value` for `ttl`. A zero `ttl` means no expiry.
    async fn set_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Drops every entry.
    async fn purge(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct Slot {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process store backed by a [`DashMap`].
///
/// Expired entries are dropped lazily when read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: DashMap<String, Slot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries that have not expired.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.iter().filter(|slot| slot.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, key: &str, value: Bytes, expires_at: Option<Instant>) {
        self.slots
            .insert(key.to_owned(), Slot { value, expires_at });
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let now = Instant::now();
        let removed = self.slots.remove_if(key, |_, slot| !slot.is_live(now));
        if removed.is_some() {
            trace!(key, "dropped expired entry");
            return Ok(None);
        }
        Ok(self.slots.get(key).map(|slot| slot.value.clone()))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        self.put(key, value, None);
        Ok(())
    }

    async fn set_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        self.put(key, value, expires_at);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.slots.remove(key);
        Ok(())
    }

    async fn purge(&self) -> Result<(), StoreError> {
        self.slots.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let store = MemoryStore::new();
        assert_eq!(store.get("/a:").await.unwrap(), None);
        store.set("/a:", Bytes::from_static(b"one")).await.unwrap();
        assert_eq!(
            store.get("/a:").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn later_write_wins() {
        let store = MemoryStore::new();
        store.set("k", Bytes::from_static(b"one")).await.unwrap();
        store
            .set_ttl("k", Bytes::from_static(b"two"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(Bytes::from_static(b"two")));
    }

    #[tokio::test]
    async fn expired_entries_disappear() {
        let store = MemoryStore::new();
        store
            .set_ttl("k", Bytes::from_static(b"v"), Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.is_empty());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let store = MemoryStore::new();
        store
            .set_ttl("k", Bytes::from_static(b"v"), Duration::ZERO)
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_and_purge() {
        let store = MemoryStore::new();
        store.set("a", Bytes::from_static(b"1")).await.unwrap();
        store.set("b", Bytes::from_static(b"2")).await.unwrap();
        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.len(), 1);
        store.purge().await.unwrap();
        assert!(store.is_empty());
    }
}

//! In-process TTL cache for record snapshots.
//!
//! The record store is slow and rate limited, so repositories keep serialized copies of the records they read here.
//! Reads go through the cache; writes go to the store first and then *delete* the affected keys. Entries are never
//! updated in place.
//!
//! The cache is an optimisation only. Anything that fails to deserialize is treated as a miss, and repositories work
//! the same (just slower) when no cache is configured.
//!
//! There is a known window between a writer deleting a key and a concurrent reader re-populating it with the value it
//! fetched before the write landed. The record store offers no transactions, so this is accepted; the TTL bounds how
//! long such a stale entry can live.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{Duration, Instant},
};

use log::*;
use serde::{de::DeserializeOwned, Serialize};

use crate::db_types::OrderId;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    expires_at: Instant,
    value: Vec<u8>,
}

#[derive(Clone)]
pub struct LedgerCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl std::fmt::Debug for LedgerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerCache(ttl: {:?}, entries: {})", self.ttl, self.len())
    }
}

impl Default for LedgerCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl LedgerCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Returns a cache for the given TTL, or `None` if `ttl` is zero, which disables caching.
    pub fn with_ttl(ttl: Duration) -> Option<Self> {
        if ttl.is_zero() {
            info!("🗃️ Cache TTL is zero. Every read will go to the record store.");
            None
        } else {
            Some(Self::new(ttl))
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A panic while holding the lock cannot leave the map in a broken state, so poisoning is ignored.
    fn read_lock(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Raw lookup. Expired entries are evicted and reported as missing.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        {
            let entries = self.read_lock();
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
                Some(_) => {},
                None => return None,
            }
        }
        trace!("🗃️ Cache entry {key} has expired");
        self.delete(key);
        None
    }

    pub fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let entry = CacheEntry { expires_at: Instant::now() + ttl, value };
        self.write_lock().insert(key.to_string(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.write_lock().remove(key);
    }

    /// Fetches and deserializes a snapshot. A snapshot that cannot be read back is evicted and treated as a miss.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                trace!("🗃️ Cache hit for {key}");
                Some(value)
            },
            Err(e) => {
                warn!("🗃️ Discarding unreadable cache entry {key}: {e}");
                self.delete(key);
                None
            },
        }
    }

    /// Serializes and stores a snapshot using the cache's default TTL.
    pub fn set_typed<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, bytes, self.ttl),
            Err(e) => warn!("🗃️ Could not serialize {key} for the cache: {e}"),
        }
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write_lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key namespaces. Each entity kind gets its own prefix so that keys built from user-supplied names never
/// collide across kinds.
pub mod keys {
    use super::OrderId;

    pub fn constant(name: &str) -> String {
        format!("cons-{name}")
    }

    pub fn aggregation(name: &str) -> String {
        format!("agg-{name}")
    }

    pub fn order(order_id: &OrderId) -> String {
        format!("order-{order_id}")
    }

    pub fn order_by_payment(external_payment_id: &str) -> String {
        format!("pay-{external_payment_id}")
    }

    pub fn purchaser(username: &str) -> String {
        format!("pur-{username}")
    }
}

//! In-memory TTL cache.

use super::entry::CacheEntry;
use super::key::CacheKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub invalidations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    invalidations: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

/// Key-value cache with per-entry expiry.
///
/// - Expiry is checked lazily on read; there is no background eviction.
/// - An entry is never returned once `now > expires_at`.
/// - Each operation takes the lock once and never holds it across an await,
///   so concurrent callers see "last write visible".
pub struct TtlCache<V> {
    entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
    stats: AtomicStats,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: AtomicStats::default(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry<V>>> {
        // Every mutation leaves the map consistent, so a poisoned lock is still usable.
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value if present and not expired. Expired entries are removed.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut entries = self.write();
        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired_at(Instant::now()),
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        if expired {
            entries.remove(key);
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = key.as_str(), "cache entry expired");
            return None;
        }
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` until `now + ttl`, replacing any prior entry.
    ///
    /// A zero TTL expires immediately: the key is cleared and nothing is stored.
    pub fn set(&self, key: CacheKey, value: V, ttl: Duration) {
        let mut entries = self.write();
        if ttl.is_zero() {
            entries.remove(&key);
            return;
        }
        entries.insert(key, CacheEntry::new(value, ttl));
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Same expiry check as [`TtlCache::get`].
    pub fn has(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Removes every entry whose key contains `pattern`. Returns how many were removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        let removed = before - entries.len();
        self.stats
            .invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        debug!(pattern, removed, "cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys in sorted order, for debugging.
    pub fn keys(&self) -> Vec<CacheKey> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, e)| !e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

//! Size bounded, time expiring caches used by the client.
//!
//! [`ExpiringLruCache`] is the shared building block. The two managers wrap
//! one instance each and own the key format for their cache.
use std::{
    collections::BTreeMap,
    hash::Hash,
    num::NonZeroUsize,
    sync::Mutex,
    time::{Duration, Instant},
};

use lru::LruCache;

pub mod event;
pub mod experiment;

pub use self::{event::EventCacheManager, experiment::ExperimentCacheManager};

/// LRU cache where every entry also expires `ttl` after it was last written.
///
/// Reads of an expired entry behave as a miss and drop the entry. When the
/// cache is full the least recently used entry is evicted, whatever its
/// remaining lifetime. Recency is refreshed by `get` and `set`.
///
/// Storage grows with the entries actually stored, so a large capacity
/// doesn't allocate up front.
pub struct ExpiringLruCache<K, V> {
    capacity: NonZeroUsize,
    ttl: Duration,
    entries: Mutex<LruCache<K, Entry<V>>>,
}

struct Entry<V> {
    inserted_at: Instant,
    value: V,
}

impl<V> Entry<V> {
    fn is_live(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

impl<K: Hash + Eq, V: Clone> ExpiringLruCache<K, V> {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let live = entries.get(key)?.is_live(self.ttl, now);
        if !live {
            entries.pop(key);
            return None;
        }
        entries.peek(key).map(|e| e.value.clone())
    }

    /// Membership test. Unlike [`get`](Self::get) it leaves recency untouched.
    pub fn contains(&self, key: &K) -> bool {
        self.contains_at(key, Instant::now())
    }

    pub fn contains_at(&self, key: &K, now: Instant) -> bool {
        let mut entries = self.lock();
        match entries.peek(key) {
            Some(entry) if entry.is_live(self.ttl, now) => true,
            Some(_) => {
                entries.pop(key);
                false
            }
            None => false,
        }
    }

    pub fn set(&self, key: K, value: V) {
        self.set_at(key, value, Instant::now())
    }

    pub fn set_at(&self, key: K, value: V, now: Instant) {
        let mut entries = self.lock();
        self.put(&mut entries, key, value, now);
    }

    /// Stores `value` unless a live entry exists for `key`. Returns whether
    /// it was stored. The check and the write happen under one lock.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        self.insert_if_absent_at(key, value, Instant::now())
    }

    pub fn insert_if_absent_at(&self, key: K, value: V, now: Instant) -> bool {
        let mut entries = self.lock();
        if let Some(entry) = entries.peek(&key) {
            if entry.is_live(self.ttl, now) {
                return false;
            }
        }
        self.put(&mut entries, key, value, now);
        true
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().pop(key).map(|e| e.value)
    }

    fn put(&self, entries: &mut LruCache<K, Entry<V>>, key: K, value: V, now: Instant) {
        entries.put(
            key,
            Entry {
                inserted_at: now,
                value,
            },
        );
        while entries.len() > self.capacity.get() {
            entries.pop_lru();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<K, Entry<V>>> {
        // a panic while holding the lock can't leave the lru in a torn state
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Renders custom subjects the same way regardless of insertion order.
pub(crate) fn canonical_custom_ids(custom_ids: &BTreeMap<String, String>) -> String {
    custom_ids
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds a cache only when `size` is non zero.
pub(crate) fn build_cache<V: Clone>(
    size: usize,
    ttl: Duration,
) -> Option<ExpiringLruCache<String, V>> {
    NonZeroUsize::new(size).map(|capacity| ExpiringLruCache::new(capacity, ttl))
}

//! Bounded, pin-aware LRU caches for decoded pages and records.
//!
//! The pager keeps a page cache keyed by page number and a record cache
//! keyed by `(table id, record key)`. Entries are handed out as `Arc`
//! clones; an entry whose `Arc` is still held elsewhere (a cursor frame,
//! an in-flight record decode) counts as *pinned* and is never evicted.
//! When every entry is pinned the cache grows past its capacity rather
//! than invalidating a buffer in use.
//!
//! Within a handle's lifetime the file is immutable, so a cache hit is
//! byte-identical to a fresh read and there is never more than one
//! decoded buffer per key.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Default number of cached pages per handle.
pub const DEFAULT_PAGE_CACHE_CAPACITY: usize = 256;
/// Default number of cached decoded records per handle.
pub const DEFAULT_RECORD_CACHE_CAPACITY: usize = 512;

struct Entry<V> {
    value: Arc<V>,
    last_used: u64,
}

/// LRU cache with reference-count pinning.
pub struct LruCache<K, V> {
    map: HashMap<K, Entry<V>>,
    capacity: usize,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            map: HashMap::new(),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    /// Look up a key, refreshing its recency on a hit.
    pub fn get(&mut self, key: &K) -> Option<Arc<V>> {
        self.tick += 1;
        let tick = self.tick;
        self.map.get_mut(key).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.value)
        })
    }

    /// Insert a value, evicting the least recently used unpinned entry
    /// when the cache is full. Re-inserting an existing key replaces the
    /// entry (the caller guarantees identical content for identical
    /// keys).
    pub fn insert(&mut self, key: K, value: Arc<V>) {
        self.tick += 1;
        if !self.map.contains_key(&key) && self.map.len() >= self.capacity {
            self.evict_one();
        }
        self.map.insert(
            key,
            Entry {
                value,
                last_used: self.tick,
            },
        );
    }

    fn evict_one(&mut self) {
        let victim = self
            .map
            .iter()
            .filter(|(_, entry)| Arc::strong_count(&entry.value) == 1)
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            self.map.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

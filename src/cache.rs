//! Bounded least-recently-used cache of transition matrices keyed by time
//!
//! Only exact key matches hit: MCMC chains re-evaluate the same unchanged
//! branch lengths over and over, and those repeat bit-for-bit. Values are
//! handed out as `Arc`s, so evicting an entry never invalidates a matrix a
//! caller is still holding.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::trace;

/// Hit/miss counters since construction (invalidation does not reset them).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit; 0 when nothing was looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

struct Slot<V> {
    time: f64,
    value: Arc<V>,
    last_used: u64,
}

/// Fixed-capacity time -> value map with LRU eviction.
pub struct BoundedTransitionCache<V> {
    capacity: usize,
    entries: HashMap<u64, Slot<V>>,
    /// last_used tick -> key, oldest first
    recency: BTreeMap<u64, u64>,
    clock: u64,
    stats: CacheStats,
}

/// Bit pattern used as the map key; -0.0 and 0.0 share a slot.
#[inline]
fn key_of(time: f64) -> u64 {
    if time == 0.0 {
        0.0_f64.to_bits()
    } else {
        time.to_bits()
    }
}

impl<V> BoundedTransitionCache<V> {
    /// Create an empty cache holding at most `capacity` entries (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::with_capacity(capacity.max(1)),
            recency: BTreeMap::new(),
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up `time`, marking the entry most recently used on a hit.
    pub fn get(&mut self, time: f64) -> Option<Arc<V>> {
        let key = key_of(time);
        let now = self.tick();
        match self.entries.get_mut(&key) {
            Some(slot) => {
                self.recency.remove(&slot.last_used);
                slot.last_used = now;
                self.recency.insert(now, key);
                self.stats.hits += 1;
                Some(Arc::clone(&slot.value))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up without touching recency or statistics.
    pub fn peek(&self, time: f64) -> Option<&Arc<V>> {
        self.entries.get(&key_of(time)).map(|slot| &slot.value)
    }

    #[inline]
    pub fn contains(&self, time: f64) -> bool {
        self.entries.contains_key(&key_of(time))
    }

    /// Insert (or replace) the value for `time` and return the stored handle.
    ///
    /// When the cache is over capacity afterwards, the least recently used
    /// entry is dropped.
    pub fn put(&mut self, time: f64, value: V) -> Arc<V> {
        self.put_shared(time, Arc::new(value))
    }

    /// Like [`put`](Self::put) for a value that is already shared.
    pub fn put_shared(&mut self, time: f64, value: Arc<V>) -> Arc<V> {
        let key = key_of(time);
        let now = self.tick();

        if let Some(old) = self.entries.insert(
            key,
            Slot {
                time,
                value: Arc::clone(&value),
                last_used: now,
            },
        ) {
            self.recency.remove(&old.last_used);
        }
        self.recency.insert(now, key);
        self.stats.insertions += 1;

        while self.entries.len() > self.capacity {
            self.evict_oldest();
        }
        value
    }

    fn evict_oldest(&mut self) {
        let Some((_, key)) = self.recency.pop_first() else {
            return;
        };
        if let Some(slot) = self.entries.remove(&key) {
            self.stats.evictions += 1;
            trace!("evicting cached transition matrix for t = {}", slot.time);
        }
    }

    /// Drop every entry. Handles already given out stay valid.
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            trace!("invalidating {} cached transition matrices", self.entries.len());
        }
        self.entries.clear();
        self.recency.clear();
        self.stats.invalidations += 1;
    }

    /// Cached times from least to most recently used.
    pub fn times_by_recency(&self) -> Vec<f64> {
        self.recency
            .values()
            .filter_map(|key| self.entries.get(key).map(|slot| slot.time))
            .collect()
    }
}

impl<V> std::fmt::Debug for BoundedTransitionCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTransitionCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

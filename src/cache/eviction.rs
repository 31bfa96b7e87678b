//! Eviction Policy Module
//!
//! Size-bounded, oldest-write-first eviction over a namespace map.

use tracing::debug;

use crate::cache::CacheMap;

/// Fraction of the byte budget above which eviction kicks in.
pub const DEFAULT_HIGH_WATER_FRACTION: f64 = 0.8;

/// Fraction of entries removed by one eviction pass.
pub const DEFAULT_EVICT_FRACTION: f64 = 0.25;

// == Eviction Policy ==
/// Budget and thresholds for one namespace.
///
/// This is FIFO by write time, not LRU: reads never protect an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionPolicy {
    /// Byte budget for the namespace
    pub max_bytes: u64,
    /// Eviction starts once total size exceeds `max_bytes * high_water_fraction`
    pub high_water_fraction: f64,
    /// Share of entries dropped per pass, rounded up
    pub evict_fraction: f64,
}

impl EvictionPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            high_water_fraction: DEFAULT_HIGH_WATER_FRACTION,
            evict_fraction: DEFAULT_EVICT_FRACTION,
        }
    }

    pub fn with_fractions(mut self, high_water_fraction: f64, evict_fraction: f64) -> Self {
        self.high_water_fraction = high_water_fraction;
        self.evict_fraction = evict_fraction;
        self
    }

    /// Size above which a pass removes entries.
    pub fn high_water_mark(&self) -> f64 {
        self.max_bytes as f64 * self.high_water_fraction
    }

    // == Check And Evict ==
    /// Removes the oldest `ceil(n * evict_fraction)` entries when the map's
    /// total size is above the high-water mark. Returns the number removed;
    /// the caller persists the map when it is non-zero.
    ///
    /// Entries written in the same millisecond are ordered by key.
    pub fn check_and_evict(&self, map: &mut CacheMap) -> usize {
        let total = total_size(map);
        if total as f64 <= self.high_water_mark() {
            return 0;
        }

        let to_remove = ((map.len() as f64) * self.evict_fraction).ceil() as usize;
        let to_remove = to_remove.min(map.len());

        let mut by_age: Vec<(u64, String)> = map
            .iter()
            .map(|(key, entry)| (entry.created_at, key.clone()))
            .collect();
        by_age.sort();

        for (_, key) in by_age.into_iter().take(to_remove) {
            map.remove(&key);
        }

        debug!(
            total_bytes = total,
            max_bytes = self.max_bytes,
            removed = to_remove,
            remaining = map.len(),
            "Evicted oldest cache entries"
        );
        to_remove
    }
}

// == Total Size ==
/// Sum of `size_bytes` across every entry, recomputed on each call.
pub fn total_size(map: &CacheMap) -> u64 {
    map.values().map(|e| e.size_bytes).sum()
}

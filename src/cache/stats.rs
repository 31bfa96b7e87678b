//! Cache Statistics Module
//!
//! Snapshot types reported by each namespace and the facade, plus the
//! in-process hit/miss counters behind them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Hit Counter ==
/// Hits and misses observed by this process. Not persisted.
#[derive(Debug, Default)]
pub struct HitCounter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Image Cache Stats ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageCacheStats {
    /// Number of stored entries, stale or not
    pub entries: usize,
    /// Sum of estimated entry sizes
    pub total_bytes: u64,
    /// Configured byte budget
    pub max_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

// == Data Cache Stats ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataCacheStats {
    /// Number of stored entries, stale or not
    pub entries: usize,
    /// Entries already past their TTL but not yet removed
    pub expired_entries: usize,
    /// Sum of estimated entry sizes
    pub total_bytes: u64,
    /// Configured byte budget
    pub max_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

// == Combined Stats ==
/// Both namespaces side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub images: ImageCacheStats,
    pub data: DataCacheStats,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_new() {
        let counter = HitCounter::new();
        assert_eq!(counter.hits(), 0);
        assert_eq!(counter.misses(), 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let counter = HitCounter::new();
        assert_eq!(counter.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let counter = HitCounter::new();
        counter.record_hit();
        counter.record_hit();
        counter.record_hit();
        assert_eq!(counter.hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counter = HitCounter::new();
        counter.record_hit();
        counter.record_miss();
        assert_eq!(counter.hit_rate(), 0.5);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = DataCacheStats {
            entries: 2,
            expired_entries: 1,
            total_bytes: 40,
            max_bytes: 1024,
            hits: 0,
            misses: 0,
            hit_rate: 0.0,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["expired_entries"], 1);
        assert_eq!(json["max_bytes"], 1024);
    }
}

//! Cache Manager Module
//!
//! Process-wide facade owning both namespaces. Constructed once by the
//! application's composition root.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::cache::{
    CacheStats, Clock, DataCache, EvictionPolicy, ImageCache, SystemClock, UrlGenerator,
    DEFAULT_DATA_TTL, DEFAULT_EVICT_FRACTION, DEFAULT_HIGH_WATER_FRACTION, DEFAULT_IMAGE_TTL,
};
use crate::storage::StorageBackend;

/// Default byte budget for each namespace.
pub const DEFAULT_NAMESPACE_MAX_BYTES: u64 = 2 * 1024 * 1024;

// == Cache Config ==
/// Budgets and TTLs for both namespaces.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub image_max_bytes: u64,
    pub data_max_bytes: u64,
    pub image_ttl: Duration,
    pub data_default_ttl: Duration,
    pub high_water_fraction: f64,
    pub evict_fraction: f64,
}

impl CacheConfig {
    fn policy(&self, max_bytes: u64) -> EvictionPolicy {
        EvictionPolicy::new(max_bytes).with_fractions(self.high_water_fraction, self.evict_fraction)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            image_max_bytes: DEFAULT_NAMESPACE_MAX_BYTES,
            data_max_bytes: DEFAULT_NAMESPACE_MAX_BYTES,
            image_ttl: DEFAULT_IMAGE_TTL,
            data_default_ttl: DEFAULT_DATA_TTL,
            high_water_fraction: DEFAULT_HIGH_WATER_FRACTION,
            evict_fraction: DEFAULT_EVICT_FRACTION,
        }
    }
}

// == Init Summary ==
/// What the startup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InitSummary {
    pub expired_removed: usize,
    pub images_evicted: usize,
    pub data_evicted: usize,
}

// == Cache Manager ==
pub struct CacheManager {
    images: ImageCache,
    data: DataCache,
}

impl CacheManager {
    /// Builds both namespaces on `backend` using the wall clock.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        config: CacheConfig,
        generator: Arc<dyn UrlGenerator>,
    ) -> Self {
        Self::with_clock(backend, config, generator, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backend: Arc<dyn StorageBackend>,
        config: CacheConfig,
        generator: Arc<dyn UrlGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let images = ImageCache::new(
            backend.clone(),
            config.policy(config.image_max_bytes),
            config.image_ttl,
            clock.clone(),
            generator,
        );
        let data = DataCache::new(
            backend,
            config.policy(config.data_max_bytes),
            config.data_default_ttl,
            clock,
        );
        Self { images, data }
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn data(&self) -> &DataCache {
        &self.data
    }

    // == Init ==
    /// Startup pass: drops stale data entries, then runs the size check on
    /// both namespaces. Images are never swept for staleness here.
    pub fn init(&self) -> InitSummary {
        let expired_removed = self.data.sweep_expired();
        let summary = InitSummary {
            expired_removed,
            images_evicted: self.images.evict_if_needed(),
            data_evicted: self.data.evict_if_needed(),
        };
        info!(
            expired_removed = summary.expired_removed,
            images_evicted = summary.images_evicted,
            data_evicted = summary.data_evicted,
            "Cache initialized"
        );
        summary
    }

    // == Clear All ==
    /// Empties both namespaces. Returns the number of entries removed.
    pub fn clear_all(&self) -> usize {
        let images = self.images.clear(None);
        // Without a pattern clearing cannot fail
        let data = self.data.clear(None).unwrap_or_default();
        info!(images, data, "Cleared all caches");
        images + data
    }

    // == All Stats ==
    pub fn all_stats(&self) -> CacheStats {
        CacheStats {
            images: self.images.stats(),
            data: self.data.stats(),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ImageCacheKeyParams, ManualClock};
    use crate::storage::MemoryStorage;

    fn generator() -> Arc<dyn UrlGenerator> {
        Arc::new(|p: &ImageCacheKeyParams| -> anyhow::Result<String> {
            Ok(format!("https://cdn.test/{}", p.file_id))
        })
    }

    fn manager(config: CacheConfig) -> (CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let manager = CacheManager::with_clock(
            Arc::new(MemoryStorage::new()),
            config,
            generator(),
            clock.clone(),
        );
        (manager, clock)
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.image_ttl, Duration::from_secs(604_800));
        assert_eq!(config.data_default_ttl, Duration::from_secs(300));
        assert_eq!(config.high_water_fraction, 0.8);
        assert_eq!(config.evict_fraction, 0.25);
    }

    #[test]
    fn test_init_sweeps_expired_data_only() {
        let (manager, clock) = manager(CacheConfig::default());
        manager.data().set("short", &1, Some(Duration::from_millis(5)));
        manager.data().set("long", &2, None);
        manager.images().get(&ImageCacheKeyParams::new("b", "f")).unwrap();

        clock.advance(Duration::from_secs(8 * 24 * 60 * 60).as_millis() as u64);
        let summary = manager.init();

        // Both data entries are past TTL by now; the stale image is left alone
        assert_eq!(summary.expired_removed, 2);
        assert_eq!(summary.images_evicted, 0);
        let stats = manager.all_stats();
        assert_eq!(stats.data.entries, 0);
        assert_eq!(stats.images.entries, 1);
    }

    #[test]
    fn test_init_evicts_oversized_namespaces() {
        let backend = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(0));
        let roomy = CacheManager::with_clock(
            backend.clone(),
            CacheConfig::default(),
            generator(),
            clock.clone(),
        );
        for i in 0..8 {
            roomy.data().set(&format!("k{}", i), &"x".repeat(20), None);
            clock.advance(1);
        }
        assert_eq!(roomy.init(), InitSummary::default());

        // Same storage reopened with a budget the record no longer fits
        let tight = CacheManager::with_clock(
            backend,
            CacheConfig {
                data_max_bytes: 10,
                ..CacheConfig::default()
            },
            generator(),
            clock,
        );
        let summary = tight.init();

        assert_eq!(summary.data_evicted, 2);
        assert_eq!(summary.expired_removed, 0);
        assert!(!tight.data().has("k0"));
        assert!(!tight.data().has("k1"));
        assert!(tight.data().has("k2"));
    }

    #[test]
    fn test_clear_all() {
        let (manager, _) = manager(CacheConfig::default());
        manager.data().set("a", &1, None);
        manager.images().get(&ImageCacheKeyParams::new("b", "f")).unwrap();

        manager.clear_all();
        let stats = manager.all_stats();
        assert_eq!(stats.data.entries, 0);
        assert_eq!(stats.images.entries, 0);
    }

    #[test]
    fn test_all_stats_reports_budgets() {
        let (manager, _) = manager(CacheConfig {
            image_max_bytes: 111,
            data_max_bytes: 222,
            ..CacheConfig::default()
        });
        let stats = manager.all_stats();
        assert_eq!(stats.images.max_bytes, 111);
        assert_eq!(stats.data.max_bytes, 222);
    }
}

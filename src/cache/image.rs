//! Image URL Cache Module
//!
//! Caches generated preview URLs under a long fixed TTL. The cache is never
//! allowed to stand between a caller and a usable URL: any bookkeeping
//! failure falls back to calling the generator directly.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{
    total_size, CacheEntry, CacheNamespace, Clock, EvictionPolicy, HitCounter, ImageCacheKeyParams,
    ImageCacheStats, NamespaceStore,
};
use crate::error::{CacheError, Result};
use crate::storage::StorageBackend;

/// Preview URLs stay valid for a week.
pub const DEFAULT_IMAGE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// == URL Generator ==
/// Produces a preview URL for a file. Synchronous and side-effect free, but
/// allowed to fail.
pub trait UrlGenerator: Send + Sync {
    fn generate(&self, params: &ImageCacheKeyParams) -> anyhow::Result<String>;
}

impl<F> UrlGenerator for F
where
    F: Fn(&ImageCacheKeyParams) -> anyhow::Result<String> + Send + Sync,
{
    fn generate(&self, params: &ImageCacheKeyParams) -> anyhow::Result<String> {
        self(params)
    }
}

// == Image Cache ==
pub struct ImageCache {
    store: NamespaceStore,
    policy: EvictionPolicy,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn UrlGenerator>,
    counter: HitCounter,
}

impl ImageCache {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        policy: EvictionPolicy,
        ttl: Duration,
        clock: Arc<dyn Clock>,
        generator: Arc<dyn UrlGenerator>,
    ) -> Self {
        Self {
            store: NamespaceStore::new(CacheNamespace::Images, backend),
            policy,
            ttl_ms: ttl.as_millis() as u64,
            clock,
            generator,
            counter: HitCounter::new(),
        }
    }

    // == Get ==
    /// Returns the cached URL for `params`, generating and storing it on a
    /// miss.
    ///
    /// Returns `Ok(None)` without touching the generator when the bucket or
    /// file id is empty. Generator errors are returned as-is and nothing is
    /// stored for the key.
    pub fn get(&self, params: &ImageCacheKeyParams) -> anyhow::Result<Option<String>> {
        if !params.is_addressable() {
            return Ok(None);
        }

        let key = params.cache_key();
        match self.lookup(&key) {
            Ok(Some(url)) => {
                self.counter.record_hit();
                debug!(key = %key, "Image cache hit");
                return Ok(Some(url));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Image cache unavailable, generating uncached URL");
                return self.generator.generate(params).map(Some);
            }
        }

        self.counter.record_miss();
        let url = self.generator.generate(params)?;

        if let Err(e) = self.store_url(&key, &url) {
            warn!(key = %key, error = %e, "Failed to cache preview URL");
        }
        Ok(Some(url))
    }

    fn lookup(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now_ms();
        self.store.try_update(|map| {
            let state = map
                .get(key)
                .map(|e| (e.is_stale(now), e.payload.as_str().map(str::to_owned)));

            match state {
                None => (Ok(None), false),
                Some((true, _)) => {
                    map.remove(key);
                    (Ok(None), true)
                }
                Some((false, Some(url))) => (Ok(Some(url)), false),
                Some((false, None)) => {
                    // Not a URL; drop it so the next call can repopulate
                    map.remove(key);
                    (Err(CacheError::CorruptEntry(key.to_string())), true)
                }
            }
        })?
    }

    fn store_url(&self, key: &str, url: &str) -> Result<()> {
        let now = self.clock.now_ms();
        let entry = CacheEntry::new(key, Value::from(url), now, self.ttl_ms);
        let policy = self.policy;

        self.store.try_update(|map| {
            map.insert(key.to_string(), entry);
            policy.check_and_evict(map);
            ((), true)
        })
    }

    // == Preload ==
    /// Warms the cache for every item. Results and failures are discarded.
    pub fn preload(&self, items: &[ImageCacheKeyParams]) {
        for params in items {
            if let Err(e) = self.get(params) {
                debug!(file_id = %params.file_id, error = %e, "Preload skipped preview");
            }
        }
    }

    // == Clear ==
    /// With a resource id, removes every preview of that file; otherwise
    /// empties the namespace. Returns the number removed.
    ///
    /// The id is matched against the encoded `fileId` fragment of each key,
    /// so it never hits parameter names or another file's id.
    pub fn clear(&self, resource_id: Option<&str>) -> usize {
        match resource_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                let fragment = ImageCacheKeyParams::file_id_fragment(id);
                self.store.update(|map| {
                    let before = map.len();
                    map.retain(|key, _| !key.contains(&fragment));
                    let removed = before - map.len();
                    (removed, removed > 0)
                })
            }
            None => self.store.clear(),
        }
    }

    /// Runs the size check outside of a write. Returns entries removed.
    pub fn evict_if_needed(&self) -> usize {
        let policy = self.policy;
        self.store.update(|map| {
            let removed = policy.check_and_evict(map);
            (removed, removed > 0)
        })
    }

    // == Stats ==
    pub fn stats(&self) -> ImageCacheStats {
        let (entries, total_bytes) = self.store.read(|map| (map.len(), total_size(map)));
        ImageCacheStats {
            entries,
            total_bytes,
            max_bytes: self.policy.max_bytes,
            hits: self.counter.hits(),
            misses: self.counter.misses(),
            hit_rate: self.counter.hit_rate(),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        backend: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
        calls: Arc<AtomicUsize>,
        cache: ImageCache,
    }

    fn fixture_with(backend: Arc<MemoryStorage>, max_bytes: u64) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000));
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let generator = move |p: &ImageCacheKeyParams| -> anyhow::Result<String> {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://cdn.test/{}/{}", p.bucket_id, p.file_id))
        };
        let cache = ImageCache::new(
            backend.clone(),
            EvictionPolicy::new(max_bytes),
            DEFAULT_IMAGE_TTL,
            clock.clone(),
            Arc::new(generator),
        );
        Fixture {
            backend,
            clock,
            calls,
            cache,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryStorage::new()), 1024 * 1024)
    }

    #[test]
    fn test_miss_then_hit() {
        let f = fixture();
        let params = ImageCacheKeyParams::new("bucket", "file123").size(400, 250);

        let first = f.cache.get(&params).unwrap();
        let second = f.cache.get(&params).unwrap();

        assert_eq!(first.as_deref(), Some("https://cdn.test/bucket/file123"));
        assert_eq!(first, second);
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_ids_skip_generator() {
        let f = fixture();

        assert_eq!(f.cache.get(&ImageCacheKeyParams::new("bucket", "")).unwrap(), None);
        assert_eq!(f.cache.get(&ImageCacheKeyParams::new("", "file")).unwrap(), None);
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_expired_url_is_regenerated() {
        let f = fixture();
        let params = ImageCacheKeyParams::new("bucket", "file123");

        f.cache.get(&params).unwrap();
        f.clock.advance(DEFAULT_IMAGE_TTL.as_millis() as u64 + 1);
        f.cache.get(&params).unwrap();

        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_generator_error_propagates_and_caches_nothing() {
        let backend = Arc::new(MemoryStorage::new());
        let generator = |_: &ImageCacheKeyParams| -> anyhow::Result<String> {
            Err(anyhow::anyhow!("preview service down"))
        };
        let cache = ImageCache::new(
            backend.clone(),
            EvictionPolicy::new(1024),
            DEFAULT_IMAGE_TTL,
            Arc::new(ManualClock::new(0)),
            Arc::new(generator),
        );

        let err = cache.get(&ImageCacheKeyParams::new("b", "f")).unwrap_err();
        assert_eq!(err.to_string(), "preview service down");
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_storage_failure_falls_back_to_generator() {
        // Quota too small for any record
        let f = fixture_with(Arc::new(MemoryStorage::with_quota(1)), 1024);
        let params = ImageCacheKeyParams::new("bucket", "file123");

        assert!(f.cache.get(&params).unwrap().is_some());
        assert!(f.cache.get(&params).unwrap().is_some());
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
        assert!(f.backend.raw("image_url_cache").is_none());
    }

    #[test]
    fn test_corrupt_entry_falls_back_and_heals() {
        let f = fixture();
        let params = ImageCacheKeyParams::new("bucket", "file123");
        let record = format!(
            r#"{{"{}":{{"payload":42,"createdAt":1000,"ttlMs":604800000,"sizeBytes":10}}}}"#,
            params.cache_key().replace('"', "\\\"")
        );
        f.backend.insert_raw("image_url_cache", record);

        // First call bypasses the bad entry, second repopulates, third hits
        f.cache.get(&params).unwrap();
        f.cache.get(&params).unwrap();
        f.cache.get(&params).unwrap();
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_by_resource() {
        let f = fixture();
        f.cache.get(&ImageCacheKeyParams::new("b", "fileA").size(100, 100)).unwrap();
        f.cache.get(&ImageCacheKeyParams::new("b", "fileA").size(400, 250)).unwrap();
        f.cache.get(&ImageCacheKeyParams::new("b", "fileB")).unwrap();

        assert_eq!(f.cache.clear(Some("fileA")), 2);
        assert_eq!(f.cache.stats().entries, 1);
    }

    #[test]
    fn test_clear_by_resource_ignores_key_text() {
        let f = fixture();
        f.cache.get(&ImageCacheKeyParams::new("b", "a1b2c3").size(100, 100)).unwrap();
        f.cache.get(&ImageCacheKeyParams::new("b", "z9y8x7")).unwrap();

        // Parameter names and partial ids match nothing
        assert_eq!(f.cache.clear(Some("Id")), 0);
        assert_eq!(f.cache.clear(Some("width")), 0);
        assert_eq!(f.cache.clear(Some("a1b2")), 0);
        assert_eq!(f.cache.stats().entries, 2);

        assert_eq!(f.cache.clear(Some("a1b2c3")), 1);
        assert!(f.cache.get(&ImageCacheKeyParams::new("b", "z9y8x7")).unwrap().is_some());
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_all() {
        let f = fixture();
        f.cache.get(&ImageCacheKeyParams::new("b", "fileA")).unwrap();
        f.cache.get(&ImageCacheKeyParams::new("b", "fileB")).unwrap();

        assert_eq!(f.cache.clear(None), 2);
        assert_eq!(f.cache.stats().entries, 0);
    }

    #[test]
    fn test_preload_populates() {
        let f = fixture();
        let items = vec![
            ImageCacheKeyParams::new("b", "f1"),
            ImageCacheKeyParams::new("b", "f2"),
            ImageCacheKeyParams::new("b", ""),
        ];

        f.cache.preload(&items);
        assert_eq!(f.cache.stats().entries, 2);
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);

        f.cache.get(&items[0]).unwrap();
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stats() {
        let f = fixture();
        let params = ImageCacheKeyParams::new("b", "f1");
        f.cache.get(&params).unwrap();
        f.cache.get(&params).unwrap();

        let stats = f.cache.stats();
        assert_eq!(stats.entries, 1);
        assert!(stats.total_bytes > 0);
        assert_eq!(stats.max_bytes, 1024 * 1024);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_write_triggers_eviction() {
        // Each entry is well over 10 bytes, so every write crosses the mark
        let f = fixture_with(Arc::new(MemoryStorage::new()), 10);
        f.cache.get(&ImageCacheKeyParams::new("b", "f1")).unwrap();
        assert_eq!(f.cache.stats().entries, 0);
    }
}

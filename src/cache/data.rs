//! Data Response Cache Module
//!
//! Caches arbitrary API responses with a per-entry TTL. Expired entries are
//! removed lazily when read.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{
    total_size, CacheEntry, CacheNamespace, Clock, DataCacheStats, EvictionPolicy, HitCounter,
    NamespaceStore,
};
use crate::error::Result;
use crate::storage::StorageBackend;

/// TTL applied when a write does not name one.
pub const DEFAULT_DATA_TTL: Duration = Duration::from_secs(5 * 60);

// == Data Cache ==
pub struct DataCache {
    store: NamespaceStore,
    policy: EvictionPolicy,
    default_ttl_ms: u64,
    clock: Arc<dyn Clock>,
    counter: HitCounter,
}

impl DataCache {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        policy: EvictionPolicy,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: NamespaceStore::new(CacheNamespace::Data, backend),
            policy,
            default_ttl_ms: default_ttl.as_millis() as u64,
            clock,
            counter: HitCounter::new(),
        }
    }

    // == Get ==
    /// Returns the live payload for `key`.
    ///
    /// An expired entry is deleted and reported as a miss. A payload that
    /// does not deserialize into `T` is also a miss but stays stored.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let Some(payload) = self.live_payload(key) else {
            self.counter.record_miss();
            debug!(key = %key, "Data cache miss");
            return None;
        };

        match serde_json::from_value(payload) {
            Ok(value) => {
                self.counter.record_hit();
                debug!(key = %key, "Data cache hit");
                Some(value)
            }
            Err(e) => {
                self.counter.record_miss();
                warn!(key = %key, error = %e, "Cached payload has unexpected shape");
                None
            }
        }
    }

    /// Payload of the live entry for `key`, deleting it if stale. Leaves the
    /// hit counters alone.
    fn live_payload(&self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();
        self.store.update(|map| match map.get(key).map(|e| e.is_stale(now)) {
            None => (None, false),
            Some(true) => {
                map.remove(key);
                (None, true)
            }
            Some(false) => (map.get(key).map(|e| e.payload.clone()), false),
        })
    }

    // == Set ==
    /// Writes or replaces `key`, stamped with the current time, then runs
    /// the size check.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Value is not serializable, not caching");
                return;
            }
        };

        let ttl_ms = ttl
            .map(|t| t.as_millis() as u64)
            .unwrap_or(self.default_ttl_ms);
        let entry = CacheEntry::new(key, payload, self.clock.now_ms(), ttl_ms);
        let policy = self.policy;

        self.store.update(|map| {
            map.insert(key.to_string(), entry);
            policy.check_and_evict(map);
            ((), true)
        });
    }

    // == Has ==
    /// Whether a live entry exists. A stale one is deleted, as in `get`, but
    /// the check is not counted as a hit or miss.
    pub fn has(&self, key: &str) -> bool {
        self.live_payload(key).is_some()
    }

    // == Remove ==
    /// Deletes `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.store.update(|map| {
            let existed = map.remove(key).is_some();
            (existed, existed)
        })
    }

    // == Clear ==
    /// With a regex, removes every key it matches; otherwise empties the
    /// namespace. Returns the number removed.
    pub fn clear(&self, pattern: Option<&str>) -> Result<usize> {
        let Some(pattern) = pattern else {
            return Ok(self.store.clear());
        };

        let re = Regex::new(pattern)?;
        let removed = self.store.update(|map| {
            let before = map.len();
            map.retain(|key, _| !re.is_match(key));
            let removed = before - map.len();
            (removed, removed > 0)
        });
        debug!(pattern = %pattern, removed, "Cleared matching data entries");
        Ok(removed)
    }

    // == Get Or Fetch ==
    /// Returns the cached value, or awaits `fetch` and caches what it
    /// resolves to.
    ///
    /// A failed fetch is returned untouched and leaves the cache as it was.
    /// Concurrent misses on the same key each run their own fetch; the last
    /// write wins.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        ttl: Option<Duration>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key) {
            return Ok(cached);
        }

        let value = fetch().await?;
        self.set(key, &value, ttl);
        Ok(value)
    }

    // == Sweep Expired ==
    /// Eagerly removes every stale entry. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        self.store.update(|map| {
            let before = map.len();
            map.retain(|_, entry| !entry.is_stale(now));
            let removed = before - map.len();
            (removed, removed > 0)
        })
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
    pub fn stats(&self) -> DataCacheStats {
        let now = self.clock.now_ms();
        let (entries, expired_entries, total_bytes) = self.store.read(|map| {
            let expired = map.values().filter(|e| e.is_stale(now)).count();
            (map.len(), expired, total_size(map))
        });
        DataCacheStats {
            entries,
            expired_entries,
            total_bytes,
            max_bytes: self.policy.max_bytes,
            hits: self.counter.hits(),
            misses: self.counter.misses(),
            hit_rate: self.counter.hit_rate(),
        }
    }
}

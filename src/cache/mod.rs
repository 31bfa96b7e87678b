//! Cache Module
//!
//! Two persisted namespaces in front of expensive calls: preview URLs
//! (`images`) and API responses (`data`), each with TTL staleness and
//! size-bounded eviction.

mod data;
mod entry;
mod eviction;
mod image;
mod keys;
mod manager;
mod stats;
mod store;


// Re-export public types
pub use data::{DataCache, DEFAULT_DATA_TTL};
pub use entry::{current_timestamp_ms, estimate_size, CacheEntry, CacheMap, Clock, ManualClock, SystemClock};
pub use eviction::{total_size, EvictionPolicy, DEFAULT_EVICT_FRACTION, DEFAULT_HIGH_WATER_FRACTION};
pub use image::{ImageCache, UrlGenerator, DEFAULT_IMAGE_TTL};
pub use keys::{generate_cache_key, DataCacheKeyParams, Gravity, ImageCacheKeyParams, IMAGE_OPERATION};
pub use manager::{CacheConfig, CacheManager, InitSummary, DEFAULT_NAMESPACE_MAX_BYTES};
pub use stats::{CacheStats, DataCacheStats, HitCounter, ImageCacheStats};
pub use store::{CacheNamespace, NamespaceStore};

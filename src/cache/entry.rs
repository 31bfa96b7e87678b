//! Cache Entry Module
//!
//! Defines the persisted entry record, the per-namespace map and the clock
//! used to judge staleness.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Map ==
/// Whole contents of one namespace, keyed by cache key.
pub type CacheMap = HashMap<String, CacheEntry>;

// == Cache Entry ==
/// A single cached payload plus its bookkeeping metadata.
///
/// Serialized as `{"payload", "createdAt", "ttlMs", "sizeBytes"}`; the cache
/// key itself is the key of the surrounding map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored value (a URL string for images, any JSON value for data)
    pub payload: Value,
    /// Timestamp of the last write (Unix milliseconds)
    pub created_at: u64,
    /// Effective time-to-live in milliseconds
    pub ttl_ms: u64,
    /// Estimated serialized size, used only for footprint accounting
    pub size_bytes: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry written at `now` and computes its size estimate.
    pub fn new(key: &str, payload: Value, now: u64, ttl_ms: u64) -> Self {
        let size_bytes = estimate_size(key, &payload);
        Self {
            payload,
            created_at: now,
            ttl_ms,
            size_bytes,
        }
    }

    // == Is Stale ==
    /// An entry is stale once strictly more than `ttl_ms` has passed since
    /// it was written. A clock that moved backwards never makes it stale.
    pub fn is_stale(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.ttl_ms
    }

    /// Remaining lifetime in milliseconds, `0` once stale.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        let age = now.saturating_sub(self.created_at);
        self.ttl_ms.saturating_sub(age)
    }
}

// == Size Estimate ==
/// Estimated footprint of an entry: key bytes plus serialized payload bytes.
pub fn estimate_size(key: &str, payload: &Value) -> u64 {
    let payload_len = serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0);
    (key.len() + payload_len) as u64
}

// == Clock ==
/// Source of "now" for TTL decisions.
pub trait Clock: Send + Sync {
    /// Current time in Unix milliseconds.
    fn now_ms(&self) -> u64;
}

/// Wall clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// Manually driven clock for simulated time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Moves the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

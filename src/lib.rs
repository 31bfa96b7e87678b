//! Dashboard Cache - client-side cache manager for the organization dashboard
//!
//! Keeps generated preview URLs and API responses in a durable,
//! quota-limited store with TTL staleness and size-bounded eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod preview;
pub mod storage;

pub use api::AppState;
pub use cache::CacheManager;
pub use config::Config;
pub use preview::PreviewUrlBuilder;

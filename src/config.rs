//! Configuration Module
//!
//! Handles loading cache budgets, TTLs and the diagnostics server settings
//! from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{
    CacheConfig, DEFAULT_DATA_TTL, DEFAULT_EVICT_FRACTION, DEFAULT_HIGH_WATER_FRACTION,
    DEFAULT_IMAGE_TTL, DEFAULT_NAMESPACE_MAX_BYTES,
};

/// Application configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Byte budget of the preview URL namespace
    pub image_max_bytes: u64,
    /// Byte budget of the API response namespace
    pub data_max_bytes: u64,
    /// TTL of preview URLs in milliseconds
    pub image_ttl_ms: u64,
    /// TTL of API responses written without an explicit one, in milliseconds
    pub data_default_ttl_ms: u64,
    /// Share of the budget above which eviction starts
    pub high_water_fraction: f64,
    /// Share of entries dropped per eviction pass
    pub evict_fraction: f64,
    /// Directory holding one record file per namespace
    pub storage_dir: PathBuf,
    /// Diagnostics HTTP server port
    pub server_port: u16,
    /// Base URL of the hosted storage API used to build preview URLs
    pub preview_endpoint: String,
    /// Project id sent with preview URLs
    pub preview_project_id: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `IMAGE_CACHE_MAX_BYTES` - Image namespace budget (default: 2 MiB)
    /// - `DATA_CACHE_MAX_BYTES` - Data namespace budget (default: 2 MiB)
    /// - `IMAGE_CACHE_TTL_MS` - Preview URL TTL (default: 7 days)
    /// - `DATA_CACHE_DEFAULT_TTL_MS` - Default data TTL (default: 5 minutes)
    /// - `CACHE_HIGH_WATER_FRACTION` - Eviction threshold (default: 0.8)
    /// - `CACHE_EVICT_FRACTION` - Share evicted per pass (default: 0.25)
    /// - `CACHE_STORAGE_DIR` - Record directory (default: `.dashboard-cache`)
    /// - `SERVER_PORT` - Diagnostics server port (default: 3000)
    /// - `PREVIEW_ENDPOINT` - Storage API base URL (default: `http://localhost/v1`)
    /// - `PREVIEW_PROJECT_ID` - Project id (default: empty)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            image_max_bytes: parse_var("IMAGE_CACHE_MAX_BYTES").unwrap_or(defaults.image_max_bytes),
            data_max_bytes: parse_var("DATA_CACHE_MAX_BYTES").unwrap_or(defaults.data_max_bytes),
            image_ttl_ms: parse_var("IMAGE_CACHE_TTL_MS").unwrap_or(defaults.image_ttl_ms),
            data_default_ttl_ms: parse_var("DATA_CACHE_DEFAULT_TTL_MS")
                .unwrap_or(defaults.data_default_ttl_ms),
            high_water_fraction: parse_fraction("CACHE_HIGH_WATER_FRACTION")
                .unwrap_or(defaults.high_water_fraction),
            evict_fraction: parse_fraction("CACHE_EVICT_FRACTION")
                .unwrap_or(defaults.evict_fraction),
            storage_dir: env::var("CACHE_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            preview_endpoint: env::var("PREVIEW_ENDPOINT").unwrap_or(defaults.preview_endpoint),
            preview_project_id: env::var("PREVIEW_PROJECT_ID")
                .unwrap_or(defaults.preview_project_id),
        }
    }

    /// Cache settings consumed by [`CacheManager`](crate::cache::CacheManager).
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            image_max_bytes: self.image_max_bytes,
            data_max_bytes: self.data_max_bytes,
            image_ttl: Duration::from_millis(self.image_ttl_ms),
            data_default_ttl: Duration::from_millis(self.data_default_ttl_ms),
            high_water_fraction: self.high_water_fraction,
            evict_fraction: self.evict_fraction,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_max_bytes: DEFAULT_NAMESPACE_MAX_BYTES,
            data_max_bytes: DEFAULT_NAMESPACE_MAX_BYTES,
            image_ttl_ms: DEFAULT_IMAGE_TTL.as_millis() as u64,
            data_default_ttl_ms: DEFAULT_DATA_TTL.as_millis() as u64,
            high_water_fraction: DEFAULT_HIGH_WATER_FRACTION,
            evict_fraction: DEFAULT_EVICT_FRACTION,
            storage_dir: PathBuf::from(".dashboard-cache"),
            server_port: 3000,
            preview_endpoint: "http://localhost/v1".to_string(),
            preview_project_id: String::new(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Fractions must be finite and within (0, 1].
fn parse_fraction(name: &str) -> Option<f64> {
    parse_var::<f64>(name).filter(|f| f.is_finite() && *f > 0.0 && *f <= 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.image_max_bytes, 2 * 1024 * 1024);
        assert_eq!(config.image_ttl_ms, 604_800_000);
        assert_eq!(config.data_default_ttl_ms, 300_000);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env() {
        // Only test in the crate that touches the environment
        env::remove_var("IMAGE_CACHE_MAX_BYTES");
        env::set_var("DATA_CACHE_MAX_BYTES", "1024");
        env::set_var("CACHE_HIGH_WATER_FRACTION", "1.5");
        env::set_var("CACHE_EVICT_FRACTION", "0.5");

        let config = Config::from_env();
        assert_eq!(config.image_max_bytes, 2 * 1024 * 1024);
        assert_eq!(config.data_max_bytes, 1024);
        assert_eq!(config.high_water_fraction, 0.8);
        assert_eq!(config.evict_fraction, 0.5);

        env::remove_var("DATA_CACHE_MAX_BYTES");
        env::remove_var("CACHE_HIGH_WATER_FRACTION");
        env::remove_var("CACHE_EVICT_FRACTION");
    }

    #[test]
    fn test_cache_config_conversion() {
        let config = Config {
            data_default_ttl_ms: 2_000,
            ..Config::default()
        };
        let cache = config.cache_config();
        assert_eq!(cache.data_default_ttl, Duration::from_secs(2));
        assert_eq!(cache.image_ttl, DEFAULT_IMAGE_TTL);
    }
}

//! Error types for the cache manager
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

// == Cache Error Enum ==
/// Failures of the cache's own bookkeeping. Errors raised by URL generators
/// or fetchers are never wrapped in this type.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The storage medium rejected a read or write
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A record or payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An invalidation pattern is not a valid regex
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A stored entry does not have the expected payload type
    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A blocking cache task panicked or was cancelled
    #[error("Cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidPattern(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage(StorageError::QuotaExceeded { .. }) => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Serialization(_) | CacheError::CorruptEntry(_) | CacheError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache bookkeeping.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_is_bad_request() {
        let err: CacheError = regex::Regex::new("(").unwrap_err().into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_quota_is_insufficient_storage() {
        let err = CacheError::from(StorageError::QuotaExceeded { needed: 10, quota: 5 });
        assert!(err.to_string().contains("quota"));
        assert_eq!(err.into_response().status(), StatusCode::INSUFFICIENT_STORAGE);
    }

    #[tokio::test]
    async fn test_failed_task_is_internal_error() {
        let join_err = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let err = CacheError::from(join_err);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unavailable_storage() {
        let err = CacheError::from(StorageError::Unavailable("disabled".into()));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

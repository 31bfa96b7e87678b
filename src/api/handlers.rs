//! API Handlers
//!
//! HTTP request handlers for the cache diagnostics endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::cache::{CacheManager, CacheStats, InitSummary};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearDataQuery, ClearImagesQuery, ClearResponse, HealthResponse, PreviewQuery, PreviewResponse,
};

/// Application state shared across all handlers.
///
/// The manager synchronizes each namespace internally, so no outer lock.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
}

impl AppState {
    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

/// Runs `f` against the manager on the blocking pool. Every cache call reads
/// or writes a whole namespace record through the storage backend.
async fn with_cache<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&CacheManager) -> T + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(&state.cache);
    Ok(tokio::task::spawn_blocking(move || f(&cache)).await?)
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStats>> {
    let stats = with_cache(&state, |cache| cache.all_stats()).await?;
    Ok(Json(stats))
}

/// Handler for GET /images/preview
///
/// Resolves a preview URL through the image cache. Generator failures are
/// reported as 502 since they come from the storage service, not the cache.
pub async fn preview_handler(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> std::result::Result<Json<PreviewResponse>, Response> {
    let params = query.into_params();
    let resolved = with_cache(&state, move |cache| cache.images().get(&params))
        .await
        .map_err(IntoResponse::into_response)?;

    match resolved {
        Ok(Some(url)) => Ok(Json(PreviewResponse { url })),
        Ok(None) => Err(CacheError::InvalidRequest(
            "bucket and file are required".to_string(),
        )
        .into_response()),
        Err(e) => Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response()),
    }
}

/// Handler for DELETE /cache
pub async fn clear_all_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let removed = with_cache(&state, |cache| cache.clear_all()).await?;
    Ok(Json(ClearResponse::new("all namespaces", removed)))
}

/// Handler for DELETE /cache/data
pub async fn clear_data_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearDataQuery>,
) -> Result<Json<ClearResponse>> {
    let removed = with_cache(&state, move |cache| cache.data().clear(query.pattern.as_deref())).await??;
    Ok(Json(ClearResponse::new("data", removed)))
}

/// Handler for DELETE /cache/images
pub async fn clear_images_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearImagesQuery>,
) -> Result<Json<ClearResponse>> {
    let removed =
        with_cache(&state, move |cache| cache.images().clear(query.resource.as_deref())).await?;
    Ok(Json(ClearResponse::new("images", removed)))
}

/// Handler for POST /cache/sweep
///
/// Reruns the startup pass: stale data entries, then size checks.
pub async fn sweep_handler(State(state): State<AppState>) -> Result<Json<InitSummary>> {
    let summary = with_cache(&state, |cache| cache.init()).await?;
    Ok(Json(summary))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

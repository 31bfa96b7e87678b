//! Dashboard Cache - diagnostics server
//!
//! Opens the on-disk cache, runs the startup sweep and serves stats and
//! invalidation endpoints for local tooling.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dashboard_cache::api::create_router;
use dashboard_cache::storage::FileStorage;
use dashboard_cache::{AppState, CacheManager, Config, PreviewUrlBuilder};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open file storage and build the cache manager
/// 4. Run the startup sweep (stale data entries, size checks)
/// 5. Serve the diagnostics router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dashboard Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: image_max_bytes={}, data_max_bytes={}, storage_dir={}, port={}",
        config.image_max_bytes,
        config.data_max_bytes,
        config.storage_dir.display(),
        config.server_port
    );

    let storage = FileStorage::new(&config.storage_dir)
        .with_context(|| format!("Failed to open cache directory {}", config.storage_dir.display()))?;
    let generator = PreviewUrlBuilder::new(&config.preview_endpoint, config.preview_project_id.clone())?;

    let cache = CacheManager::new(Arc::new(storage), config.cache_config(), Arc::new(generator));
    cache.init();

    let app = create_router(AppState::new(cache));

    // Diagnostics are local-only
    let addr = SocketAddr::from(([127, 0, 0, 1], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Diagnostics listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

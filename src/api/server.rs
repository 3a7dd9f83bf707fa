use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{
    services::{
        cancel_download, download_file, extract_info, health, list_downloads, list_formats,
        start_download, task_status,
    },
    state::AppState,
};
use crate::config::Config;
use crate::engine::YtDlpEngine;
use crate::manager::DownloadManager;
use crate::observability::Metrics;
use crate::tasks::{RetentionPolicy, spawn_sweeper};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/extract", post(extract_info))
        .route("/api/download", post(start_download))
        .route("/api/status/{task_id}", get(task_status))
        .route("/api/downloads", get(list_downloads))
        .route("/api/cancel/{task_id}", post(cancel_download))
        .route("/api/formats", post(list_formats))
        .route("/api/download/{task_id}", get(download_file))
        .route("/health", get(health))
        .with_state(state)
        // Transparently decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
}

pub async fn run(address: Option<SocketAddr>, config_path: Option<PathBuf>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .map_err(|e| format!("Failed to load config: {}", e))?;

    let address = address.unwrap_or(config.server.bind_addr);

    info!(path = %config.server.download_dir.display(), "Preparing download directory");
    tokio::fs::create_dir_all(&config.server.download_dir)
        .await
        .map_err(|e| format!("Failed to create download directory: {}", e))?;

    let engine = Arc::new(YtDlpEngine::from_config(&config.engine));
    info!(binary = %engine.binary().display(), "Using yt-dlp engine");

    let metrics = Arc::new(Metrics::new());
    let manager = DownloadManager::from_config(&config, engine, metrics.clone())
        .map_err(|e| format!("Failed to initialize download manager: {}", e))?;

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        manager.store().clone(),
        RetentionPolicy::from(&config.retention),
        metrics.clone(),
        shutdown.clone(),
    );

    let app = router(AppState::new(config, manager, metrics));

    let listener = TcpListener::bind(address).await?;
    info!(%address, "vidfetch API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    sweeper.await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

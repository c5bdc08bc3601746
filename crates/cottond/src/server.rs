//! HTTP server for cottond

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use cotton_core::METRICS;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::collector::CollectorStore;
use crate::config::CollectorConfig;
use crate::routes;

/// Application state shared across handlers
pub struct AppState {
    pub collector: CollectorStore,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(collector: CollectorStore) -> Self {
        Self {
            collector,
            start_time: Instant::now(),
        }
    }
}

/// Build the router with tracing and permissive CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::ingest_routes())
        .merge(routes::history_routes())
        .merge(routes::info_routes())
        .with_state(Arc::new(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Open the history, bind, and serve until ctrl-c.
pub async fn run(config: CollectorConfig) -> Result<()> {
    let history = config
        .open_history()
        .await
        .with_context(|| format!("failed to open {:?} history", config.store))?;
    let records = history.len().await.context("failed to read history")?;
    info!(backend = history.backend(), records, "history ready");

    let app = app(AppState::new(CollectorStore::new(history)));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    METRICS.flush();
    Ok(())
}

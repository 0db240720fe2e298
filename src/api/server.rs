//! HTTP server lifecycle: open the store, build the router, serve until
//! Ctrl-C.

use std::sync::Arc;

use thiserror::Error;

use crate::api::router::api_router;
use crate::api::types::ApiContext;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::SchedulingError;
use crate::scheduler::AppointmentScheduler;
use crate::store::sqlite::SqliteStore;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to open database: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid scheduler settings: {0}")]
    Scheduler(#[from] SchedulingError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire the SQLite-backed context for `config`.
pub fn build_context(config: &Config) -> Result<ApiContext, ServerError> {
    let store = Arc::new(SqliteStore::open(&config.database_path)?);
    tracing::info!(path = %config.database_path.display(), "Database opened");

    let scheduler = AppointmentScheduler::new(
        store.clone(),
        store.clone(),
        config.hours,
        config.default_duration_minutes,
    )?;

    Ok(ApiContext::new(
        Arc::new(scheduler),
        store.clone(),
        store,
        Arc::new(SystemClock),
    ))
}

/// Serve the API on `config.bind_addr` until Ctrl-C.
pub async fn serve(config: Config) -> Result<(), ServerError> {
    let ctx = build_context(&config)?;
    let app = api_router(ctx);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_addr,
            source,
        })?;
    tracing::info!(addr = %config.bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutdown signal received");
}

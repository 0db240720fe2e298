//! Clinic appointment scheduling: agenda availability, booking,
//! rescheduling without double-booking, and the appointment lifecycle,
//! served over a session-authenticated JSON API.

pub mod api;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod scheduler;
pub mod session;
pub mod store;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
}

/// Initialize logging, load configuration from the environment and serve.
pub async fn run() -> Result<(), RunError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    api::serve(config).await?;
    Ok(())
}

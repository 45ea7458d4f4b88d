//! Structured logging

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Install the global JSON subscriber
///
/// The filter comes from `service.log_level`, falling back to `info` when it
/// does not parse. Fails if a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize tracing: {e}")))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );

    Ok(())
}

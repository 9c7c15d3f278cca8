//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Initialize JSON logging filtered by `service.log_level`
///
/// An unparsable level falls back to `info`. Fails when a global subscriber
/// is already installed, e.g. by a host application or an earlier call.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize tracing: {}", e)))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );

    Ok(())
}

/// Shutdown tracing
///
/// The fmt subscriber writes synchronously, so there is nothing to flush.
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_does_not_panic() {
        let mut config = Config::default();
        config.service.log_level = "not a level[".to_string();
        // The first call may lose the global subscriber to another test
        let _ = init_tracing(&config);
        let second = init_tracing(&config);
        assert!(second.is_err());
        shutdown_tracing();
    }
}

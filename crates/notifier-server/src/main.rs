//! Notifier server entry point.
//!
//! Loads `notifier-config.yaml` (or the file named by `NOTIFIER_CONFIG`),
//! initializes logging, opens storage for the configured environment and
//! serves the HTTP API until `Ctrl-C`.

use notifier_server::{NotifierConfig, bootstrap, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage setup or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = NotifierConfig::load()?;

    // Initialize structured logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        environment = %config.environment,
        host = %config.server.host,
        port = config.server.port,
        "notifier-server starting"
    );

    let state = bootstrap(&config).await?;
    start_server(&config.server, state).await?;

    Ok(())
}

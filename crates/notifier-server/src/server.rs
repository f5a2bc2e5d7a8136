//! HTTP server lifecycle management.
//!
//! [`bootstrap`] turns a [`NotifierConfig`] into shared [`AppState`]: it
//! loads the query registry, opens the database for the configured
//! environment and builds the session manager. [`start_server`] binds the
//! listener and serves the router until `Ctrl-C`.

use std::net::SocketAddr;
use std::sync::Arc;

use notifier_auth::SessionManager;
use notifier_db::{Database, DbError, QueryRegistry};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::{ConfigError, NotifierConfig, ServerConfig};
use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The query registry or database could not be set up.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Build the application state described by `config`.
///
/// In `test` mode the database is a private in-memory `SQLite` database;
/// in `production` it is `database.url`. Migrations run either way.
///
/// # Errors
///
/// Returns [`ServerError::Config`] if the auth section is out of range, or
/// [`ServerError::Db`] if the query map cannot be loaded, the database
/// cannot be reached or a migration fails.
pub async fn bootstrap(config: &NotifierConfig) -> Result<Arc<AppState>, ServerError> {
    let registry = match &config.queries.path {
        Some(path) => QueryRegistry::load(path)?,
        None => QueryRegistry::builtin()?,
    };
    info!(templates = registry.len(), "Query registry loaded");
    let registry = Arc::new(registry);

    let db = if config.environment.is_test() {
        Database::in_memory(registry).await?
    } else {
        let db = Database::connect(&config.database.pool_config(), registry).await?;
        db.run_migrations().await?;
        db
    };
    info!(
        environment = %config.environment,
        backend = ?db.backend(),
        "Database ready"
    );

    let sessions = SessionManager::new(db, &config.auth.session_config()?);
    Ok(Arc::new(AppState::new(sessions)))
}

/// Start the HTTP server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until `Ctrl-C`. In-flight requests finish before it returns.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(Arc::clone(&state));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Notifier server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    state.db.close().await;
    info!("Notifier server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
    }
    info!("Shutdown signal received");
}

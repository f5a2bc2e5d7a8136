//! Shared application state for the HTTP API.
//!
//! [`AppState`] is built once at startup, wrapped in [`Arc`](std::sync::Arc)
//! and injected into handlers via Axum's `State` extractor. It carries no
//! mutable state of its own; the database is the single source of truth.

use notifier_auth::SessionManager;
use notifier_db::Database;

/// Upper bound on `limit` for list endpoints.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database context with every record gateway.
    pub db: Database,
    /// Registration, login and session resolution.
    pub sessions: SessionManager,
}

impl AppState {
    /// Build state around a session manager, sharing its database.
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            db: sessions.database().clone(),
            sessions,
        }
    }
}

//! Axum router construction for the notifier API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing. Authentication is not a layer: protected handlers take a
//! [`Requester`](crate::auth::Requester) argument, so public and protected
//! methods can share a path.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// See [`handlers`] for the endpoint table.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        // Users
        .route("/users", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route("/users/check", get(handlers::check))
        .route("/users/logout", post(handlers::logout))
        .route(
            "/users/{id}",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        // Topics
        .route(
            "/topics",
            get(handlers::list_topics).post(handlers::create_topic),
        )
        .route("/topics/{id}/subscribers", post(handlers::subscribe))
        .route("/topics/{id}/notifications", post(handlers::publish))
        // Notifications
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/read", put(handlers::mark_read))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! HTTP API server for the notifier service.
//!
//! A thin Axum surface over the data and auth layers:
//!
//! - **Users**: register, log in, check and revoke sessions, edit or delete
//!   one's own profile
//! - **Topics**: create, list, subscribe
//! - **Notifications**: publish to a topic's subscribers, read one's inbox,
//!   mark notifications read
//!
//! Every response body is a JSON [`Envelope`](error::Envelope). Protected
//! routes resolve the caller through the [`Requester`](auth::Requester)
//! extractor.
//!
//! # Architecture
//!
//! ```text
//! notifier-config.yaml + env --> NotifierConfig --> bootstrap --> AppState
//!                                                                   |
//! HTTP --> Router --> handler --(Requester, ValidatedJson)--> SessionManager
//!                                                         \-> Database gateways
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use config::{ConfigError, NotifierConfig};
pub use error::{ApiError, Envelope};
pub use router::build_router;
pub use server::{ServerError, bootstrap, start_server};
pub use state::AppState;

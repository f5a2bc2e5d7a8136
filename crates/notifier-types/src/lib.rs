//! Shared type definitions for the notifier service.
//!
//! Records defined here are plain value objects: they are built from a
//! request body or a row scan, handed to a gateway call, and dropped. The
//! database stays the single source of truth. Types flow downstream to
//! `TypeScript` via `ts-rs` for API clients.
//!
//! # Modules
//!
//! - [`records`] -- `UserProfile`, `Topic`, `Subscriber`, `Notification`
//! - [`environment`] -- Process-wide storage mode flag

pub mod environment;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use environment::{Environment, UnknownEnvironment};
pub use records::{Notification, Subscriber, Topic, UserProfile};

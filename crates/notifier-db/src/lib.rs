//! Data layer for the notifier service.
//!
//! SQL lives in an external query map; this crate resolves templates by
//! path, composes the dynamic parts of each statement, binds every value as
//! a parameter and scans rows back into records by column name.
//!
//! # Architecture
//!
//! ```text
//! Gateway call (UserStore, TopicStore, SubscriberStore, NotificationStore)
//!     |
//!     +-- ColumnAccessor -----> insert columns, value tuples, SET lists,
//!     |                         scan targets
//!     +-- Predicate composer --> " WHERE ..." + modifiers
//!     |
//!     +-- Executor ------------> QueryRegistry template + Bindings
//!         |
//!         +-- sqlx Any driver (PostgreSQL, or in-memory SQLite in test mode)
//! ```
//!
//! # Modules
//!
//! - [`registry`] -- Query template registry
//! - [`value`] -- Bindable values and value sinks
//! - [`predicate`] -- `WHERE` clause and modifier composition
//! - [`column`] -- Name-addressed record fields
//! - [`executor`] -- Statement execution, cursors, transactions
//! - [`database`] -- Connection pool and shared context
//! - [`user_store`], [`topic_store`], [`subscriber_store`],
//!   [`notification_store`] -- Record gateways
//! - [`error`] -- Shared error types

pub mod column;
pub mod database;
pub mod error;
pub mod executor;
pub mod notification_store;
pub mod predicate;
pub mod registry;
pub mod subscriber_store;
pub mod topic_store;
pub mod user_store;
pub mod value;

// Re-export primary types for convenience.
pub use column::{ColumnAccessor, ColumnDef, ColumnKind};
pub use database::{Backend, Database, DatabaseConfig};
pub use error::DbError;
pub use executor::{Cursor, Executor, ReadQuery, transaction};
pub use notification_store::NotificationStore;
pub use predicate::{ComposeError, Connective, Direction, Modifier, Operator, Predicate};
pub use registry::QueryRegistry;
pub use subscriber_store::SubscriberStore;
pub use topic_store::TopicStore;
pub use user_store::UserStore;
pub use value::{Bindings, Inline, SqlValue, ValueSink};

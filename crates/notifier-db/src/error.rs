//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`]. Driver failures are wrapped
//! as [`DbError::Execution`]; everything else names the contract that was
//! broken (unknown template path, missing column selection, zero rows).

use crate::predicate::ComposeError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The query template source could not be read or parsed, or the
    /// database configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A template path did not resolve to a template string.
    #[error("query template not found: {0}")]
    TemplateNotFound(String),

    /// A template's placeholder count differs from the supplied arguments.
    #[error("template `{path}` expects {expected} arguments, got {got}")]
    TemplateArguments {
        /// The template path.
        path: String,
        /// Placeholders in the template.
        expected: usize,
        /// Arguments supplied by the caller.
        got: usize,
    },

    /// A read was issued without any column selection.
    #[error("read requires at least one selected column")]
    FilterRequired,

    /// A requested column does not exist on the target record.
    #[error("unknown column `{column}` on `{table}`")]
    UnknownColumn {
        /// The record's table.
        table: &'static str,
        /// The requested column name.
        column: String,
    },

    /// A scanned value did not match the record field's type.
    #[error("column `{column}` expected {expected} value")]
    ColumnType {
        /// The column being assigned.
        column: &'static str,
        /// The expected value kind.
        expected: &'static str,
    },

    /// An update allow-list matched no updatable column.
    #[error("nothing to update on `{0}`")]
    NothingToUpdate(&'static str),

    /// A `WHERE` or modifier clause could not be composed.
    #[error("clause composition error: {0}")]
    Compose(#[from] ComposeError),

    /// A get or find matched zero rows.
    #[error("no rows found in `{0}`")]
    NotFound(&'static str),

    /// The driver failed to execute a statement.
    #[error("execution error: {0}")]
    Execution(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Whether this error is the uniform "no rows" signal.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the driver rejected a write for breaking a unique constraint
    /// (a taken email, a repeated subscription).
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Execution(sqlx::Error::Database(db)) if db.is_unique_violation())
    }
}

//! Bindable values and the sinks that turn them into SQL text.
//!
//! Composers never splice a value into SQL directly. They hand it to a
//! [`ValueSink`], which returns the text to splice: [`Bindings`] records the
//! value and returns a numbered placeholder (`$1`, `$2`, ...), while
//! [`Inline`] returns an escaped literal for diagnostics.

use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::Any;

use crate::error::DbError;

/// A value that can be bound to a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Text.
    Text(String),
}

impl SqlValue {
    /// Render as a SQL literal. Text is single-quoted with embedded quotes
    /// doubled.
    pub fn to_literal(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(true) => String::from("TRUE"),
            Self::Bool(false) => String::from("FALSE"),
            Self::Int(value) => value.to_string(),
            Self::Text(value) => format!("'{}'", value.replace('\'', "''")),
        }
    }

    /// Convert into a text field value. `NULL` becomes the empty string.
    pub fn into_text(self, column: &'static str) -> Result<String, DbError> {
        match self {
            Self::Text(value) => Ok(value),
            Self::Null => Ok(String::new()),
            Self::Bool(_) | Self::Int(_) => Err(DbError::ColumnType {
                column,
                expected: "text",
            }),
        }
    }

    /// Convert into an integer field value. `NULL` becomes zero.
    pub fn into_int(self, column: &'static str) -> Result<i64, DbError> {
        match self {
            Self::Int(value) => Ok(value),
            Self::Null => Ok(0),
            Self::Bool(_) | Self::Text(_) => Err(DbError::ColumnType {
                column,
                expected: "integer",
            }),
        }
    }

    /// Convert into a boolean field value. Integers are truthy when non-zero
    /// and `NULL` is false.
    pub fn into_bool(self, column: &'static str) -> Result<bool, DbError> {
        match self {
            Self::Bool(value) => Ok(value),
            Self::Int(value) => Ok(value != 0),
            Self::Null => Ok(false),
            Self::Text(_) => Err(DbError::ColumnType {
                column,
                expected: "boolean",
            }),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Receives values during clause composition and returns the SQL text that
/// stands in for each one.
pub trait ValueSink {
    /// Accept `value` and return the text to splice where it belongs.
    fn placeholder(&mut self, value: SqlValue) -> String;
}

/// Collects values for parameter binding, handing out `$n` placeholders in
/// the order values arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: Vec<SqlValue>,
}

impl Bindings {
    /// Create an empty binding list.
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Number of values bound so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value has been bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The bound values in placeholder order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Attach every value to `query` in placeholder order.
    pub(crate) fn bind_to<'q>(
        self,
        query: Query<'q, Any, AnyArguments<'q>>,
    ) -> Query<'q, Any, AnyArguments<'q>> {
        self.values
            .into_iter()
            .fold(query, |query, value| match value {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Bool(value) => query.bind(value),
                SqlValue::Int(value) => query.bind(value),
                SqlValue::Text(value) => query.bind(value),
            })
    }
}

impl ValueSink for Bindings {
    fn placeholder(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }
}

/// Renders values as escaped literals instead of binding them.
///
/// Only for diagnostics and tests; executed statements always bind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl ValueSink for Inline {
    fn placeholder(&mut self, value: SqlValue) -> String {
        value.to_literal()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn literal_escapes_quotes() {
        assert_eq!(SqlValue::from("O'Brien").to_literal(), "'O''Brien'");
        assert_eq!(SqlValue::Int(-4).to_literal(), "-4");
        assert_eq!(SqlValue::Bool(true).to_literal(), "TRUE");
        assert_eq!(SqlValue::from(Option::<i64>::None).to_literal(), "NULL");
    }

    #[test]
    fn bindings_number_placeholders_in_arrival_order() {
        let mut bindings = Bindings::new();
        assert_eq!(bindings.placeholder(SqlValue::from("a")), "$1");
        assert_eq!(bindings.placeholder(SqlValue::Int(7)), "$2");
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.values(), &[SqlValue::from("a"), SqlValue::Int(7)]);
    }

    #[test]
    fn conversions_accept_null_as_zero_value() {
        assert_eq!(SqlValue::Null.into_text("email").unwrap(), "");
        assert_eq!(SqlValue::Null.into_int("id").unwrap(), 0);
        assert!(!SqlValue::Null.into_bool("is_read").unwrap());
        assert!(SqlValue::Int(1).into_bool("is_read").unwrap());
    }

    #[test]
    fn conversions_reject_mismatched_kinds() {
        let err = SqlValue::from("x").into_int("id").unwrap_err();
        assert_eq!(err.to_string(), "column `id` expected integer value");
    }
}

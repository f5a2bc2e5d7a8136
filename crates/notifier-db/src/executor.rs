//! Statement execution over registry templates.
//!
//! A statement is built in three steps: resolve a template path, compose
//! the dynamic fragments (select list, `WHERE`, modifiers, value tuples)
//! with values routed into [`Bindings`], then fill the template's `{}`
//! placeholders with those fragments in order. The result runs with every
//! value bound as a parameter.
//!
//! Reads return a [`Cursor`] that decodes rows into records by column
//! position. Writes return the generated id of the last affected row when
//! the template has a `RETURNING` clause.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, AnyPool, Row};

use crate::column::{
    ColumnAccessor, ColumnKind, compose_bulk_tuples, insert_columns, require_scan_targets,
    rows_per_insert,
};
use crate::error::DbError;
use crate::predicate::{Modifier, Predicate, compose_modifiers, compose_where};
use crate::registry::QueryRegistry;
use crate::value::{Bindings, SqlValue};

/// Template placeholder marker.
const PLACEHOLDER: &str = "{}";

/// Fill the `{}` placeholders of `template` with `args`, in order.
///
/// # Errors
///
/// Returns [`DbError::TemplateArguments`] if the number of placeholders
/// differs from the number of arguments.
pub fn format_template(path: &str, template: &str, args: &[&str]) -> Result<String, DbError> {
    let expected = template.matches(PLACEHOLDER).count();
    if expected != args.len() {
        return Err(DbError::TemplateArguments {
            path: path.to_owned(),
            expected,
            got: args.len(),
        });
    }

    let mut out = String::with_capacity(template.len());
    let mut pieces = template.split(PLACEHOLDER);
    if let Some(head) = pieces.next() {
        out.push_str(head);
    }
    for (arg, piece) in args.iter().zip(pieces) {
        out.push_str(arg);
        out.push_str(piece);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// ReadQuery
// ---------------------------------------------------------------------------

/// Column selection, filter and modifiers for a read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadQuery {
    columns: Vec<String>,
    predicates: Vec<Predicate>,
    modifiers: Vec<Modifier>,
}

impl ReadQuery {
    /// Select the named columns; `["*"]` selects all of them.
    pub fn select<I, T>(columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            predicates: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    /// Select every column.
    pub fn all() -> Self {
        Self::select(["*"])
    }

    /// Append predicates to the `WHERE` clause.
    #[must_use]
    pub fn filter(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Append trailing modifiers.
    #[must_use]
    pub fn modify(mut self, modifiers: impl IntoIterator<Item = Modifier>) -> Self {
        self.modifiers.extend(modifiers);
        self
    }

    /// The selected column names as given.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Rows returned by a read, decoded into `R` on demand.
pub struct Cursor<R> {
    rows: Vec<AnyRow>,
    targets: Vec<usize>,
    record: PhantomData<fn() -> R>,
}

impl<R: ColumnAccessor> Cursor<R> {
    /// Number of rows fetched.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the read matched nothing.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decode every row. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ColumnType`] or [`DbError::Execution`] if a value
    /// cannot be decoded into its field.
    pub fn all(self) -> Result<Vec<R>, DbError> {
        self.rows
            .iter()
            .map(|row| decode_row::<R>(row, &self.targets))
            .collect()
    }

    /// Decode the first row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row matched.
    pub fn one(self) -> Result<R, DbError> {
        let row = self.rows.first().ok_or(DbError::NotFound(R::TABLE))?;
        decode_row::<R>(row, &self.targets)
    }
}

/// Decode one row whose columns are the record columns at `targets`.
fn decode_row<R: ColumnAccessor>(row: &AnyRow, targets: &[usize]) -> Result<R, DbError> {
    let mut record = R::default();
    for (position, &idx) in targets.iter().enumerate() {
        let def = R::column_def(idx).ok_or_else(|| DbError::UnknownColumn {
            table: R::TABLE,
            column: format!("#{idx}"),
        })?;
        let value = decode_column(row, position, def.kind)?;
        record.assign_at(idx, value)?;
    }
    Ok(record)
}

/// Read the value at `position` as `kind`.
///
/// `SQLite` stores booleans as `INTEGER` `0`/`1`; those are read as
/// integers when the driver has no boolean to offer.
pub(crate) fn decode_column(
    row: &AnyRow,
    position: usize,
    kind: ColumnKind,
) -> Result<SqlValue, DbError> {
    let value = match kind {
        ColumnKind::Text => SqlValue::from(row.try_get::<Option<String>, _>(position)?),
        ColumnKind::Int => SqlValue::from(row.try_get::<Option<i64>, _>(position)?),
        ColumnKind::Bool => match row.try_get::<Option<bool>, _>(position) {
            Ok(value) => SqlValue::from(value),
            Err(_) => SqlValue::from(row.try_get::<Option<i64>, _>(position)?.map(|v| v != 0)),
        },
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs registry templates against a connection.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<QueryRegistry>,
}

impl Executor {
    /// Create an executor over a loaded registry.
    pub const fn new(registry: Arc<QueryRegistry>) -> Self {
        Self { registry }
    }

    /// The registry templates are resolved from.
    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    /// Resolve `path` and fill its placeholders with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::TemplateNotFound`] or
    /// [`DbError::TemplateArguments`].
    pub fn resolve_and_format(&self, path: &str, args: &[&str]) -> Result<String, DbError> {
        let template = self.registry.resolve(path)?;
        format_template(path, template, args)
    }

    /// Execute a write statement.
    ///
    /// `args` fill the template's placeholders and must already contain
    /// the `$n` markers whose values are in `bindings`. Returns the id in
    /// the first column of the last returned row, or `None` when the
    /// statement returns nothing.
    ///
    /// # Errors
    ///
    /// Returns a template error, or [`DbError::Execution`] if the driver
    /// rejects the statement.
    pub async fn write<'e, E>(
        &self,
        executor: E,
        path: &str,
        args: &[&str],
        bindings: Bindings,
    ) -> Result<Option<i64>, DbError>
    where
        E: sqlx::Executor<'e, Database = Any>,
    {
        let sql = self.resolve_and_format(path, args)?;
        tracing::debug!(path, statement = %sql, binds = bindings.len(), "Executing write");

        let rows = bindings.bind_to(sqlx::query(&sql)).fetch_all(executor).await?;
        let id = match rows.last() {
            Some(row) if !row.columns().is_empty() => Some(row.try_get::<i64, _>(0)?),
            _ => None,
        };
        Ok(id)
    }

    /// Insert `records` through the multi-row template at `path`.
    ///
    /// The rows are split into statements of at most [`rows_per_insert`]
    /// records so no statement exceeds the backend's bind limit. Run it on
    /// a transaction's connection to keep the chunks atomic. Returns the id
    /// reported by the last statement; an empty slice runs nothing.
    ///
    /// # Errors
    ///
    /// Returns the first failing chunk's error; later chunks do not run.
    pub async fn bulk_write<R>(
        &self,
        conn: &mut AnyConnection,
        path: &str,
        records: &[R],
    ) -> Result<Option<i64>, DbError>
    where
        R: ColumnAccessor + Sync,
    {
        let columns = insert_columns::<R>();
        let mut last = None;
        for chunk in records.chunks(rows_per_insert::<R>()) {
            let mut bindings = Bindings::new();
            let tuples = compose_bulk_tuples(chunk, &mut bindings);
            last = self
                .write(&mut *conn, path, &[&columns, &tuples], bindings)
                .await?;
        }
        Ok(last)
    }

    /// Execute a read and return its rows as a cursor over `R`.
    ///
    /// The template's two placeholders receive the select list and the
    /// `WHERE` clause followed by the modifiers. `*` expands to every
    /// column of `R` by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::FilterRequired`] if no column is selected,
    /// [`DbError::UnknownColumn`] for a column `R` does not have, a compose
    /// or template error, or [`DbError::Execution`].
    pub async fn read<'e, R, E>(
        &self,
        executor: E,
        path: &str,
        query: &ReadQuery,
    ) -> Result<Cursor<R>, DbError>
    where
        R: ColumnAccessor,
        E: sqlx::Executor<'e, Database = Any>,
    {
        if query.columns.is_empty() {
            return Err(DbError::FilterRequired);
        }
        let requested: Vec<&str> = query.columns.iter().map(String::as_str).collect();
        let targets = require_scan_targets::<R>(&requested)?;
        let select_list = targets
            .iter()
            .filter_map(|&idx| R::column_def(idx).map(|def| def.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut bindings = Bindings::new();
        let mut clause = compose_where(&query.predicates, &mut bindings)?;
        clause.push_str(&compose_modifiers(&query.modifiers));

        let sql = self.resolve_and_format(path, &[&select_list, &clause])?;
        tracing::debug!(path, statement = %sql, binds = bindings.len(), "Executing read");

        let rows = bindings.bind_to(sqlx::query(&sql)).fetch_all(executor).await?;
        Ok(Cursor {
            rows,
            targets,
            record: PhantomData,
        })
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Run `unit` inside a transaction.
///
/// Commits when `unit` succeeds. When it fails, the transaction is rolled
/// back and the unit's error is returned; a failed commit is rolled back
/// when the transaction is dropped.
///
/// # Errors
///
/// Returns the unit's error, or [`DbError::Execution`] if the transaction
/// cannot be started or committed.
pub async fn transaction<T, F>(pool: &AnyPool, unit: F) -> Result<T, DbError>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut AnyConnection) -> BoxFuture<'c, Result<T, DbError>> + Send,
{
    let mut tx = pool.begin().await?;
    match unit(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "Transaction rollback failed");
            }
            tracing::warn!(error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}

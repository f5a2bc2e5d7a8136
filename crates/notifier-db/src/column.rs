//! Name-addressed access to record fields.
//!
//! Each record type declares its columns once, in table order, and maps a
//! column position to a field in both directions. Everything else (scan
//! targets for a select list, insert column lists, value tuples, `SET`
//! clauses) is derived from that one declaration.

use crate::error::DbError;
use crate::predicate::validate_identifier;
use crate::value::{SqlValue, ValueSink};

/// Value kind of a column, used to pick a decoder when scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Text.
    Text,
    /// 64-bit integer.
    Int,
    /// Boolean.
    Bool,
}

/// Static description of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name as it appears in SQL and in the record.
    pub name: &'static str,
    /// Value kind.
    pub kind: ColumnKind,
    /// Filled by the database on insert; never written by the client.
    pub generated: bool,
    /// Stored as `NULL` when the field holds its zero value.
    pub nullable: bool,
    /// Part of the primary key; never updated.
    pub key: bool,
}

impl ColumnDef {
    /// A plain column.
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            generated: false,
            nullable: false,
            key: false,
        }
    }

    /// A database-generated primary key.
    pub const fn generated_key(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Int,
            generated: true,
            nullable: false,
            key: true,
        }
    }

    /// A client-supplied primary key.
    pub const fn key(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            generated: false,
            nullable: false,
            key: true,
        }
    }

    /// Mark the column as stored `NULL` when its field is empty.
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A record whose fields can be read and written by column name.
pub trait ColumnAccessor: Default + Send + Unpin + 'static {
    /// Table the record maps onto.
    const TABLE: &'static str;

    /// Columns in table order.
    fn schema() -> &'static [ColumnDef];

    /// Current value of the field at column position `idx`.
    fn value_at(&self, idx: usize) -> Option<SqlValue>;

    /// Assign the field at column position `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ColumnType`] if `value` does not fit the field and
    /// [`DbError::UnknownColumn`] if `idx` is out of range.
    fn assign_at(&mut self, idx: usize, value: SqlValue) -> Result<(), DbError>;

    /// Position of the column called `name`.
    fn column_location(name: &str) -> Option<usize> {
        Self::schema().iter().position(|def| def.name == name)
    }

    /// Every column position, in table order.
    fn all_column_locations() -> Vec<usize> {
        (0..Self::schema().len()).collect()
    }

    /// Definition of the column at `idx`.
    fn column_def(idx: usize) -> Option<&'static ColumnDef> {
        Self::schema().get(idx)
    }
}

/// Error for an out-of-range column position, shared by the record impls.
pub(crate) fn unknown_position<R: ColumnAccessor>(idx: usize) -> DbError {
    DbError::UnknownColumn {
        table: R::TABLE,
        column: format!("#{idx}"),
    }
}

/// Map requested column names to field positions.
///
/// `["*"]` selects every column. Unknown names map to `None` so callers can
/// decide whether to skip them or fail.
pub fn resolve_scan_targets<R: ColumnAccessor>(requested: &[&str]) -> Vec<Option<usize>> {
    if requested == ["*"] {
        return R::all_column_locations().into_iter().map(Some).collect();
    }
    requested
        .iter()
        .map(|name| R::column_location(name))
        .collect()
}

/// Like [`resolve_scan_targets`], failing on the first unknown name.
///
/// # Errors
///
/// Returns [`DbError::UnknownColumn`] naming the first unmatched column.
pub fn require_scan_targets<R: ColumnAccessor>(requested: &[&str]) -> Result<Vec<usize>, DbError> {
    if requested == ["*"] {
        return Ok(R::all_column_locations());
    }
    requested
        .iter()
        .map(|name| {
            R::column_location(name).ok_or_else(|| DbError::UnknownColumn {
                table: R::TABLE,
                column: (*name).to_owned(),
            })
        })
        .collect()
}

/// Positions of the columns an insert writes: everything not generated.
pub fn insert_locations<R: ColumnAccessor>() -> Vec<usize> {
    R::schema()
        .iter()
        .enumerate()
        .filter(|(_, def)| !def.generated)
        .map(|(idx, _)| idx)
        .collect()
}

/// Bind parameters one statement may carry on every supported backend.
///
/// `SQLite` caps a statement at 32 766 variables, `PostgreSQL` at 65 535.
pub const MAX_BIND_PARAMETERS: usize = 32_766;

/// Rows of `R` that fit in one multi-row insert without exceeding
/// [`MAX_BIND_PARAMETERS`]. Never zero.
pub fn rows_per_insert<R: ColumnAccessor>() -> usize {
    let per_row = insert_locations::<R>().len().max(1);
    MAX_BIND_PARAMETERS.checked_div(per_row).unwrap_or(1).max(1)
}

/// Comma-separated insert column list, e.g. `user_id, topic_id, message`.
pub fn insert_columns<R: ColumnAccessor>() -> String {
    insert_locations::<R>()
        .into_iter()
        .filter_map(|idx| R::column_def(idx).map(|def| def.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Field value prepared for writing: empty nullable text becomes `NULL`.
fn write_value<R: ColumnAccessor>(record: &R, idx: usize) -> SqlValue {
    let value = record.value_at(idx).unwrap_or(SqlValue::Null);
    match (R::column_def(idx), value) {
        (Some(def), SqlValue::Text(text)) if def.nullable && text.is_empty() => SqlValue::Null,
        (_, value) => value,
    }
}

/// One parenthesized value tuple for an insert, e.g. `($1, $2, $3)`.
pub fn compose_value_tuple<R: ColumnAccessor, S: ValueSink>(record: &R, sink: &mut S) -> String {
    let values: Vec<String> = insert_locations::<R>()
        .into_iter()
        .map(|idx| sink.placeholder(write_value(record, idx)))
        .collect();
    format!("({})", values.join(", "))
}

/// Comma-joined value tuples for a multi-row insert.
pub fn compose_bulk_tuples<R: ColumnAccessor, S: ValueSink>(records: &[R], sink: &mut S) -> String {
    records
        .iter()
        .map(|record| compose_value_tuple(record, sink))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SET` list for the allowed columns, e.g. `title = $1, description = $2`.
///
/// Keys, generated columns and names the record does not have are skipped.
///
/// # Errors
///
/// Returns [`DbError::NothingToUpdate`] when no allowed column remains, or
/// [`DbError::Compose`] for a malformed column name.
pub fn compose_update_set<R: ColumnAccessor, S: ValueSink>(
    record: &R,
    allow: &[&str],
    sink: &mut S,
) -> Result<String, DbError> {
    let mut assignments = Vec::new();
    for name in allow {
        validate_identifier(name)?;
        let Some(idx) = R::column_location(name) else {
            continue;
        };
        let Some(def) = R::column_def(idx) else {
            continue;
        };
        if def.key || def.generated {
            continue;
        }
        let placeholder = sink.placeholder(write_value(record, idx));
        assignments.push(format!("{} = {placeholder}", def.name));
    }
    if assignments.is_empty() {
        return Err(DbError::NothingToUpdate(R::TABLE));
    }
    Ok(assignments.join(", "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::value::{Bindings, Inline};

    #[derive(Debug, Default, PartialEq)]
    struct Chore {
        id: i64,
        name: String,
        note: String,
        done: bool,
    }

    const CHORE_COLUMNS: &[ColumnDef] = &[
        ColumnDef::generated_key("id"),
        ColumnDef::new("name", ColumnKind::Text),
        ColumnDef::new("note", ColumnKind::Text).nullable(),
        ColumnDef::new("done", ColumnKind::Bool),
    ];

    impl ColumnAccessor for Chore {
        const TABLE: &'static str = "chores";

        fn schema() -> &'static [ColumnDef] {
            CHORE_COLUMNS
        }

        fn value_at(&self, idx: usize) -> Option<SqlValue> {
            match idx {
                0 => Some(SqlValue::Int(self.id)),
                1 => Some(SqlValue::from(&self.name)),
                2 => Some(SqlValue::from(&self.note)),
                3 => Some(SqlValue::Bool(self.done)),
                _ => None,
            }
        }

        fn assign_at(&mut self, idx: usize, value: SqlValue) -> Result<(), DbError> {
            match idx {
                0 => self.id = value.into_int("id")?,
                1 => self.name = value.into_text("name")?,
                2 => self.note = value.into_text("note")?,
                3 => self.done = value.into_bool("done")?,
                _ => return Err(unknown_position::<Self>(idx)),
            }
            Ok(())
        }
    }

    #[test]
    fn star_resolves_to_every_column_in_order() {
        assert_eq!(
            resolve_scan_targets::<Chore>(&["*"]),
            vec![Some(0), Some(1), Some(2), Some(3)]
        );
    }

    #[test]
    fn unknown_names_resolve_to_none_or_fail() {
        assert_eq!(
            resolve_scan_targets::<Chore>(&["done", "missing", "id"]),
            vec![Some(3), None, Some(0)]
        );
        assert!(matches!(
            require_scan_targets::<Chore>(&["name", "missing"]),
            Err(DbError::UnknownColumn { table: "chores", column }) if column == "missing"
        ));
    }

    #[test]
    fn assign_then_read_back_by_name() {
        let mut chore = Chore::default();
        let idx = Chore::column_location("name").unwrap();
        chore.assign_at(idx, SqlValue::from("alpha")).unwrap();
        assert_eq!(chore.value_at(idx), Some(SqlValue::from("alpha")));
        assert!(chore.assign_at(9, SqlValue::Null).is_err());
    }

    #[test]
    fn insert_skips_generated_and_nulls_empty_nullable() {
        let chore = Chore {
            id: 99,
            name: String::from("a"),
            ..Chore::default()
        };
        assert_eq!(insert_columns::<Chore>(), "name, note, done");
        assert_eq!(
            compose_value_tuple(&chore, &mut Inline),
            "('a', NULL, FALSE)"
        );
    }

    #[test]
    fn bulk_tuples_number_placeholders_across_rows() {
        let rows = [Chore::default(), Chore::default()];
        let mut bindings = Bindings::new();
        assert_eq!(
            compose_bulk_tuples(&rows, &mut bindings),
            "($1, $2, $3), ($4, $5, $6)"
        );
        assert_eq!(bindings.len(), 6);
    }

    #[test]
    fn rows_per_insert_keeps_binds_under_the_limit() {
        let rows = rows_per_insert::<Chore>();
        assert_eq!(rows, MAX_BIND_PARAMETERS / 3);
        assert!(rows * insert_locations::<Chore>().len() <= MAX_BIND_PARAMETERS);
        assert!((rows + 1) * insert_locations::<Chore>().len() > MAX_BIND_PARAMETERS);
    }

    #[test]
    fn update_set_honors_allow_list_and_skips_keys() {
        let chore = Chore {
            id: 1,
            name: String::from("b"),
            done: true,
            ..Chore::default()
        };
        assert_eq!(
            compose_update_set(&chore, &["id", "done", "unknown", "name"], &mut Inline).unwrap(),
            "done = TRUE, name = 'b'"
        );
        assert!(matches!(
            compose_update_set(&chore, &["id"], &mut Inline),
            Err(DbError::NothingToUpdate("chores"))
        ));
        assert!(matches!(
            compose_update_set(&chore, &["name; --"], &mut Inline),
            Err(DbError::Compose(_))
        ));
    }
}

//! Gateway for the `topics` table.

use notifier_types::Topic;
use sqlx::AnyPool;

use crate::column::{
    ColumnAccessor, ColumnDef, ColumnKind, compose_update_set, compose_value_tuple,
    insert_columns, unknown_position,
};
use crate::error::DbError;
use crate::executor::{Executor, ReadQuery};
use crate::predicate::{Direction, Modifier, Predicate, compose_where};
use crate::value::{Bindings, SqlValue};

const TOPIC_COLUMNS: &[ColumnDef] = &[
    ColumnDef::generated_key("id"),
    ColumnDef::new("user_id", ColumnKind::Text),
    ColumnDef::new("title", ColumnKind::Text),
    ColumnDef::new("description", ColumnKind::Text),
];

impl ColumnAccessor for Topic {
    const TABLE: &'static str = "topics";

    fn schema() -> &'static [ColumnDef] {
        TOPIC_COLUMNS
    }

    fn value_at(&self, idx: usize) -> Option<SqlValue> {
        match idx {
            0 => Some(SqlValue::Int(self.id)),
            1 => Some(SqlValue::from(&self.user_id)),
            2 => Some(SqlValue::from(&self.title)),
            3 => Some(SqlValue::from(&self.description)),
            _ => None,
        }
    }

    fn assign_at(&mut self, idx: usize, value: SqlValue) -> Result<(), DbError> {
        match idx {
            0 => self.id = value.into_int("id")?,
            1 => self.user_id = value.into_text("user_id")?,
            2 => self.title = value.into_text("title")?,
            3 => self.description = value.into_text("description")?,
            _ => return Err(unknown_position::<Self>(idx)),
        }
        Ok(())
    }
}

/// Operations on the `topics` table.
pub struct TopicStore<'a> {
    pool: &'a AnyPool,
    executor: &'a Executor,
}

impl<'a> TopicStore<'a> {
    /// Create a new topic store bound to a connection pool.
    pub const fn new(pool: &'a AnyPool, executor: &'a Executor) -> Self {
        Self { pool, executor }
    }

    /// Insert a topic and return its generated id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the insert fails or returns no id.
    pub async fn insert(&self, topic: &Topic) -> Result<i64, DbError> {
        let mut bindings = Bindings::new();
        let tuple = compose_value_tuple(topic, &mut bindings);
        let id = self
            .executor
            .write(self.pool, "topics.create", &[&insert_columns::<Topic>(), &tuple], bindings)
            .await?
            .ok_or(DbError::Execution(sqlx::Error::RowNotFound))?;
        tracing::debug!(topic_id = id, owner = %topic.user_id, "Inserted topic");
        Ok(id)
    }

    /// Fetch a topic by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no topic has this id.
    pub async fn get(&self, id: i64) -> Result<Topic, DbError> {
        self.executor
            .read::<Topic, _>(
                self.pool,
                "topics.get",
                &ReadQuery::all().filter([Predicate::eq("id", id)]),
            )
            .await?
            .one()
    }

    /// List topics in id order, shaped by `modifiers` (e.g. `LIMIT`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the query fails.
    pub async fn list(&self, modifiers: Vec<Modifier>) -> Result<Vec<Topic>, DbError> {
        let mut shaped = vec![Modifier::order_by("id", Direction::Asc)?];
        shaped.extend(modifiers);
        self.executor
            .read::<Topic, _>(self.pool, "topics.get", &ReadQuery::all().modify(shaped))
            .await?
            .all()
    }

    /// List the topics owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the query fails.
    pub async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Topic>, DbError> {
        let query = ReadQuery::all()
            .filter([Predicate::eq("user_id", user_id)])
            .modify([Modifier::order_by("id", Direction::Asc)?]);
        self.executor
            .read::<Topic, _>(self.pool, "topics.get", &query)
            .await?
            .all()
    }

    /// Write the allow-listed columns of `topic` to the row with its id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NothingToUpdate`] if `allow` names no updatable
    /// column, or [`DbError::Execution`] if the update fails.
    pub async fn update(&self, topic: &Topic, allow: &[&str]) -> Result<(), DbError> {
        let mut bindings = Bindings::new();
        let set = compose_update_set(topic, allow, &mut bindings)?;
        let clause = compose_where(&[Predicate::eq("id", topic.id)], &mut bindings)?;
        self.executor
            .write(self.pool, "topics.update", &[&set, &clause], bindings)
            .await?;
        tracing::debug!(topic_id = topic.id, columns = ?allow, "Updated topic");
        Ok(())
    }

    /// Delete a topic by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the delete fails.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let mut bindings = Bindings::new();
        let clause = compose_where(&[Predicate::eq("id", id)], &mut bindings)?;
        self.executor
            .write(self.pool, "topics.delete", &[&clause], bindings)
            .await?;
        tracing::debug!(topic_id = id, "Deleted topic");
        Ok(())
    }
}

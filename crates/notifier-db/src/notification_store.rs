//! Gateway for the `notifications` table, including topic fan-out.
//!
//! Publishing on a topic writes one unread notification per subscriber.
//! The subscriber read and the bulk insert share one transaction, so a
//! publish is either delivered to every subscriber or to none.

use notifier_types::{Notification, Subscriber};
use sqlx::AnyPool;

use crate::column::{
    ColumnAccessor, ColumnDef, ColumnKind, compose_bulk_tuples, compose_value_tuple,
    insert_columns, unknown_position,
};
use crate::error::DbError;
use crate::executor::{Executor, ReadQuery, transaction};
use crate::predicate::{Direction, Modifier, Predicate, all_of, compose_where};
use crate::value::{Bindings, SqlValue, ValueSink};

/// Template of the multi-row notification insert.
const BULK_CREATE: &str = "notifications.bulkCreate";

const NOTIFICATION_COLUMNS: &[ColumnDef] = &[
    ColumnDef::generated_key("id"),
    ColumnDef::new("user_id", ColumnKind::Text),
    ColumnDef::new("topic_id", ColumnKind::Int),
    ColumnDef::new("message", ColumnKind::Text),
    ColumnDef::new("is_read", ColumnKind::Bool),
];

impl ColumnAccessor for Notification {
    const TABLE: &'static str = "notifications";

    fn schema() -> &'static [ColumnDef] {
        NOTIFICATION_COLUMNS
    }

    fn value_at(&self, idx: usize) -> Option<SqlValue> {
        match idx {
            0 => Some(SqlValue::Int(self.id)),
            1 => Some(SqlValue::from(&self.user_id)),
            2 => Some(SqlValue::Int(self.topic_id)),
            3 => Some(SqlValue::from(&self.message)),
            4 => Some(SqlValue::Bool(self.is_read)),
            _ => None,
        }
    }

    fn assign_at(&mut self, idx: usize, value: SqlValue) -> Result<(), DbError> {
        match idx {
            0 => self.id = value.into_int("id")?,
            1 => self.user_id = value.into_text("user_id")?,
            2 => self.topic_id = value.into_int("topic_id")?,
            3 => self.message = value.into_text("message")?,
            4 => self.is_read = value.into_bool("is_read")?,
            _ => return Err(unknown_position::<Self>(idx)),
        }
        Ok(())
    }
}

/// Parenthesized, comma-joined id list for an `IN` clause, e.g. `($1, $2)`.
///
/// Callers must not pass an empty slice; `()` is not valid SQL.
pub fn compose_id_bulk_format<S: ValueSink>(ids: &[i64], sink: &mut S) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|&id| sink.placeholder(SqlValue::Int(id)))
        .collect();
    format!("({})", items.join(", "))
}

/// Comma-joined value tuples for a multi-row notification insert.
pub fn compose_input_bulk_format<S: ValueSink>(notifications: &[Notification], sink: &mut S) -> String {
    compose_bulk_tuples(notifications, sink)
}

/// Operations on the `notifications` table.
pub struct NotificationStore<'a> {
    pool: &'a AnyPool,
    executor: &'a Executor,
}

impl<'a> NotificationStore<'a> {
    /// Create a new notification store bound to a connection pool.
    pub const fn new(pool: &'a AnyPool, executor: &'a Executor) -> Self {
        Self { pool, executor }
    }

    /// Insert one notification and return its generated id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the insert fails or returns no id.
    pub async fn insert(&self, notification: &Notification) -> Result<i64, DbError> {
        let mut bindings = Bindings::new();
        let tuple = compose_value_tuple(notification, &mut bindings);
        let id = self
            .executor
            .write(
                self.pool,
                "notifications.create",
                &[&insert_columns::<Notification>(), &tuple],
                bindings,
            )
            .await?
            .ok_or(DbError::Execution(sqlx::Error::RowNotFound))?;
        tracing::debug!(notification_id = id, user_id = %notification.user_id, "Inserted notification");
        Ok(id)
    }

    /// Insert several notifications in one transaction and return the last
    /// generated id. Large batches are split across statements to stay
    /// under the bind limit. An empty slice writes nothing and returns
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the insert fails; no row is written
    /// then.
    pub async fn bulk_insert(&self, notifications: &[Notification]) -> Result<Option<i64>, DbError> {
        if notifications.is_empty() {
            return Ok(None);
        }
        let executor = self.executor.clone();
        let batch = notifications.to_vec();
        let last = transaction(self.pool, move |conn| {
            Box::pin(async move { executor.bulk_write(conn, BULK_CREATE, &batch).await })
        })
        .await?;
        tracing::debug!(count = notifications.len(), "Inserted notifications");
        Ok(last)
    }

    /// Fetch a notification by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no notification has this id.
    pub async fn get(&self, id: i64) -> Result<Notification, DbError> {
        self.executor
            .read::<Notification, _>(
                self.pool,
                "notifications.get",
                &ReadQuery::all().filter([Predicate::eq("id", id)]),
            )
            .await?
            .one()
    }

    /// Notifications delivered to `user_id`, newest first, shaped by
    /// `modifiers` (e.g. `LIMIT` and `OFFSET` for one page).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        modifiers: Vec<Modifier>,
    ) -> Result<Vec<Notification>, DbError> {
        let mut conditions = vec![Predicate::eq("user_id", user_id)];
        if unread_only {
            conditions.push(Predicate::eq("is_read", false));
        }
        let mut shaped = vec![Modifier::order_by("id", Direction::Desc)?];
        shaped.extend(modifiers);
        let query = ReadQuery::all().filter(all_of(conditions)).modify(shaped);
        self.executor
            .read::<Notification, _>(self.pool, "notifications.get", &query)
            .await?
            .all()
    }

    /// Mark the listed notifications of `user_id` as read. Ids that belong
    /// to other users are left untouched. An empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the update fails.
    pub async fn mark_read(&self, user_id: &str, ids: &[i64]) -> Result<(), DbError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut bindings = Bindings::new();
        let owner = compose_where(&[Predicate::eq("user_id", user_id)], &mut bindings)?;
        let id_list = compose_id_bulk_format(ids, &mut bindings);
        self.executor
            .write(self.pool, "notifications.markRead", &[&owner, &id_list], bindings)
            .await?;
        tracing::debug!(user_id = %user_id, count = ids.len(), "Marked notifications read");
        Ok(())
    }

    /// Delete a notification by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the delete fails.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let mut bindings = Bindings::new();
        let clause = compose_where(&[Predicate::eq("id", id)], &mut bindings)?;
        self.executor
            .write(self.pool, "notifications.delete", &[&clause], bindings)
            .await?;
        tracing::debug!(notification_id = id, "Deleted notification");
        Ok(())
    }

    /// Deliver `message` to every subscriber of `topic_id` and return the
    /// number of notifications written. A topic with no subscribers
    /// publishes nothing. Topics too large for one insert statement are
    /// written in several, all inside the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any statement fails; the transaction is then
    /// rolled back and no subscriber receives the message.
    pub async fn publish(&self, topic_id: i64, message: &str) -> Result<usize, DbError> {
        let executor = self.executor.clone();
        let message = message.to_owned();
        let delivered = transaction(self.pool, move |conn| {
            Box::pin(async move {
                let query = ReadQuery::all()
                    .filter([Predicate::eq("topic_id", topic_id)])
                    .modify([Modifier::order_by("id", Direction::Asc)?]);
                let subscribers = executor
                    .read::<Subscriber, _>(&mut *conn, "subscribers.get", &query)
                    .await?
                    .all()?;
                let batch: Vec<Notification> = subscribers
                    .iter()
                    .map(|subscriber| Notification::unread(&subscriber.user_id, topic_id, &message))
                    .collect();
                executor.bulk_write(&mut *conn, BULK_CREATE, &batch).await?;
                Ok(batch.len())
            })
        })
        .await?;

        tracing::info!(topic_id, delivered, "Published notification");
        Ok(delivered)
    }
}

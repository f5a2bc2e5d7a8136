//! Gateway for the `subscribers` table.
//!
//! A user subscribes to a topic at most once; the table's unique
//! `(topic_id, user_id)` constraint rejects repeats.

use notifier_types::Subscriber;
use sqlx::AnyPool;

use crate::column::{
    ColumnAccessor, ColumnDef, ColumnKind, compose_value_tuple, insert_columns,
    unknown_position,
};
use crate::error::DbError;
use crate::executor::{Executor, ReadQuery};
use crate::predicate::{Direction, Modifier, Predicate, all_of, compose_where};
use crate::value::{Bindings, SqlValue};

const SUBSCRIBER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::generated_key("id"),
    ColumnDef::new("topic_id", ColumnKind::Int),
    ColumnDef::new("user_id", ColumnKind::Text),
];

impl ColumnAccessor for Subscriber {
    const TABLE: &'static str = "subscribers";

    fn schema() -> &'static [ColumnDef] {
        SUBSCRIBER_COLUMNS
    }

    fn value_at(&self, idx: usize) -> Option<SqlValue> {
        match idx {
            0 => Some(SqlValue::Int(self.id)),
            1 => Some(SqlValue::Int(self.topic_id)),
            2 => Some(SqlValue::from(&self.user_id)),
            _ => None,
        }
    }

    fn assign_at(&mut self, idx: usize, value: SqlValue) -> Result<(), DbError> {
        match idx {
            0 => self.id = value.into_int("id")?,
            1 => self.topic_id = value.into_int("topic_id")?,
            2 => self.user_id = value.into_text("user_id")?,
            _ => return Err(unknown_position::<Self>(idx)),
        }
        Ok(())
    }
}

/// Operations on the `subscribers` table.
pub struct SubscriberStore<'a> {
    pool: &'a AnyPool,
    executor: &'a Executor,
}

impl<'a> SubscriberStore<'a> {
    /// Create a new subscriber store bound to a connection pool.
    pub const fn new(pool: &'a AnyPool, executor: &'a Executor) -> Self {
        Self { pool, executor }
    }

    /// Subscribe a user to a topic and return the subscription id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the insert fails, including when
    /// the user is already subscribed.
    pub async fn insert(&self, subscriber: &Subscriber) -> Result<i64, DbError> {
        let mut bindings = Bindings::new();
        let tuple = compose_value_tuple(subscriber, &mut bindings);
        let id = self
            .executor
            .write(
                self.pool,
                "subscribers.create",
                &[&insert_columns::<Subscriber>(), &tuple],
                bindings,
            )
            .await?
            .ok_or(DbError::Execution(sqlx::Error::RowNotFound))?;
        tracing::debug!(
            subscriber_id = id,
            topic_id = subscriber.topic_id,
            user_id = %subscriber.user_id,
            "Inserted subscriber"
        );
        Ok(id)
    }

    /// Fetch a subscription by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no subscription has this id.
    pub async fn get(&self, id: i64) -> Result<Subscriber, DbError> {
        self.executor
            .read::<Subscriber, _>(
                self.pool,
                "subscribers.get",
                &ReadQuery::all().filter([Predicate::eq("id", id)]),
            )
            .await?
            .one()
    }

    /// Fetch the subscription of `user_id` to `topic_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the user is not subscribed.
    pub async fn find(&self, topic_id: i64, user_id: &str) -> Result<Subscriber, DbError> {
        let query = ReadQuery::all().filter(all_of([
            Predicate::eq("topic_id", topic_id),
            Predicate::eq("user_id", user_id),
        ]));
        self.executor
            .read::<Subscriber, _>(self.pool, "subscribers.get", &query)
            .await?
            .one()
    }

    /// Every subscription to `topic_id`, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the query fails.
    pub async fn list_by_topic(&self, topic_id: i64) -> Result<Vec<Subscriber>, DbError> {
        let query = ReadQuery::all()
            .filter([Predicate::eq("topic_id", topic_id)])
            .modify([Modifier::order_by("id", Direction::Asc)?]);
        self.executor
            .read::<Subscriber, _>(self.pool, "subscribers.get", &query)
            .await?
            .all()
    }

    /// Delete a subscription by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the delete fails.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let mut bindings = Bindings::new();
        let clause = compose_where(&[Predicate::eq("id", id)], &mut bindings)?;
        self.executor
            .write(self.pool, "subscribers.delete", &[&clause], bindings)
            .await?;
        tracing::debug!(subscriber_id = id, "Deleted subscriber");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Inline;

    #[test]
    fn value_tuple_holds_topic_then_user() {
        let subscriber = Subscriber {
            id: 0,
            topic_id: 3,
            user_id: String::from("user/xyz"),
        };
        assert_eq!(insert_columns::<Subscriber>(), "topic_id, user_id");
        assert_eq!(compose_value_tuple(&subscriber, &mut Inline), "(3, 'user/xyz')");
    }
}

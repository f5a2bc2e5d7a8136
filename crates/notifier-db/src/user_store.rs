//! Gateway for the `users` table.
//!
//! User ids are text generated by the caller, so inserts return no id.
//! The `token` column is stored `NULL` until an access token is issued.

use notifier_types::UserProfile;
use sqlx::AnyPool;

use crate::column::{
    ColumnAccessor, ColumnDef, ColumnKind, compose_update_set, compose_value_tuple,
    insert_columns, unknown_position,
};
use crate::error::DbError;
use crate::executor::{Executor, ReadQuery, transaction};
use crate::predicate::{Predicate, any_of};
use crate::value::{Bindings, SqlValue, ValueSink};

const USER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::key("id", ColumnKind::Text),
    ColumnDef::new("email", ColumnKind::Text),
    ColumnDef::new("password", ColumnKind::Text),
    ColumnDef::new("token", ColumnKind::Text).nullable(),
    ColumnDef::new("username", ColumnKind::Text),
    ColumnDef::new("first_name", ColumnKind::Text),
    ColumnDef::new("last_name", ColumnKind::Text),
    ColumnDef::new("phone_number", ColumnKind::Text),
];

impl ColumnAccessor for UserProfile {
    const TABLE: &'static str = "users";

    fn schema() -> &'static [ColumnDef] {
        USER_COLUMNS
    }

    fn value_at(&self, idx: usize) -> Option<SqlValue> {
        let field = match idx {
            0 => &self.id,
            1 => &self.email,
            2 => &self.password,
            3 => &self.token,
            4 => &self.username,
            5 => &self.first_name,
            6 => &self.last_name,
            7 => &self.phone_number,
            _ => return None,
        };
        Some(SqlValue::from(field))
    }

    fn assign_at(&mut self, idx: usize, value: SqlValue) -> Result<(), DbError> {
        let (column, field) = match idx {
            0 => ("id", &mut self.id),
            1 => ("email", &mut self.email),
            2 => ("password", &mut self.password),
            3 => ("token", &mut self.token),
            4 => ("username", &mut self.username),
            5 => ("first_name", &mut self.first_name),
            6 => ("last_name", &mut self.last_name),
            7 => ("phone_number", &mut self.phone_number),
            _ => return Err(unknown_position::<Self>(idx)),
        };
        *field = value.into_text(column)?;
        Ok(())
    }
}

/// Operations on the `users` table.
pub struct UserStore<'a> {
    pool: &'a AnyPool,
    executor: &'a Executor,
}

impl<'a> UserStore<'a> {
    /// Create a new user store bound to a connection pool.
    pub const fn new(pool: &'a AnyPool, executor: &'a Executor) -> Self {
        Self { pool, executor }
    }

    /// Insert one user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the insert fails, e.g. on a
    /// duplicate id or email.
    pub async fn insert(&self, user: &UserProfile) -> Result<(), DbError> {
        let mut bindings = Bindings::new();
        let tuple = compose_value_tuple(user, &mut bindings);
        self.executor
            .write(self.pool, "users.create", &[&insert_columns::<UserProfile>(), &tuple], bindings)
            .await?;
        tracing::debug!(user_id = %user.id, "Inserted user");
        Ok(())
    }

    /// Insert several users in one transaction. Large slices are split
    /// across statements to stay under the bind limit. An empty slice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the insert fails; no row is written
    /// then.
    pub async fn bulk_insert(&self, users: &[UserProfile]) -> Result<(), DbError> {
        if users.is_empty() {
            return Ok(());
        }
        let executor = self.executor.clone();
        let batch = users.to_vec();
        transaction(self.pool, move |conn| {
            Box::pin(async move { executor.bulk_write(conn, "users.create", &batch).await })
        })
        .await?;
        tracing::debug!(count = users.len(), "Inserted users");
        Ok(())
    }

    /// Fetch a user by id with every column.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no user has this id.
    pub async fn get(&self, id: &str) -> Result<UserProfile, DbError> {
        self.find(ReadQuery::all().filter([Predicate::eq("id", id)]))
            .await
    }

    /// Fetch the first user matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if nothing matches, or
    /// [`DbError::UnknownColumn`] for a column users do not have.
    pub async fn find(&self, query: ReadQuery) -> Result<UserProfile, DbError> {
        self.executor
            .read::<UserProfile, _>(self.pool, "users.get", &query)
            .await?
            .one()
    }

    /// Fetch a user by login email.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no user has this email.
    pub async fn find_by_email(&self, email: &str) -> Result<UserProfile, DbError> {
        self.find(ReadQuery::all().filter([Predicate::eq("email", email)]))
            .await
    }

    /// Fetch the user currently holding `access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no user holds it.
    pub async fn find_by_token(&self, access_token: &str) -> Result<UserProfile, DbError> {
        self.find(ReadQuery::all().filter([Predicate::eq("token", access_token)]))
            .await
    }

    /// Write the allow-listed columns of `user` to the row with its id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NothingToUpdate`] if `allow` names no updatable
    /// column, or [`DbError::Execution`] if the update fails.
    pub async fn update(&self, user: &UserProfile, allow: &[&str]) -> Result<(), DbError> {
        let mut bindings = Bindings::new();
        let set = compose_update_set(user, allow, &mut bindings)?;
        let clause = by_id(&user.id, &mut bindings)?;
        self.executor
            .write(self.pool, "users.update", &[&set, &clause], bindings)
            .await?;
        tracing::debug!(user_id = %user.id, columns = ?allow, "Updated user");
        Ok(())
    }

    /// Delete a user by id. Deleting a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<(), DbError> {
        let mut bindings = Bindings::new();
        let clause = by_id(id, &mut bindings)?;
        self.executor
            .write(self.pool, "users.delete", &[&clause], bindings)
            .await?;
        tracing::debug!(user_id = %id, "Deleted user");
        Ok(())
    }

    /// Delete every user whose id is in `ids`. An empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execution`] if the delete fails.
    pub async fn bulk_delete(&self, ids: &[&str]) -> Result<(), DbError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut bindings = Bindings::new();
        let predicates = any_of(ids.iter().map(|id| Predicate::eq("id", *id)));
        let clause = crate::predicate::compose_where(&predicates, &mut bindings)?;
        self.executor
            .write(self.pool, "users.delete", &[&clause], bindings)
            .await?;
        tracing::debug!(count = ids.len(), "Deleted users");
        Ok(())
    }
}

fn by_id<S: ValueSink>(id: &str, sink: &mut S) -> Result<String, DbError> {
    Ok(crate::predicate::compose_where(&[Predicate::eq("id", id)], sink)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::column::resolve_scan_targets;
    use crate::value::Inline;

    #[test]
    fn every_field_round_trips_through_its_column() {
        let mut user = UserProfile::default();
        for (idx, def) in UserProfile::schema().iter().enumerate() {
            user.assign_at(idx, SqlValue::from(def.name)).unwrap();
        }
        assert_eq!(user.id, "id");
        assert_eq!(user.phone_number, "phone_number");
        for (idx, def) in UserProfile::schema().iter().enumerate() {
            assert_eq!(user.value_at(idx), Some(SqlValue::from(def.name)));
        }
    }

    #[test]
    fn empty_token_is_written_as_null() {
        let user = UserProfile {
            id: String::from("user/abc"),
            email: String::from("a@b.c"),
            ..UserProfile::default()
        };
        assert_eq!(
            compose_value_tuple(&user, &mut Inline),
            "('user/abc', 'a@b.c', '', NULL, '', '', '', '')"
        );
    }

    #[test]
    fn update_never_touches_the_id() {
        let user = UserProfile {
            id: String::from("user/abc"),
            token: String::from("t-1"),
            ..UserProfile::default()
        };
        assert_eq!(
            compose_update_set(&user, &["id", "token"], &mut Inline).unwrap(),
            "token = 't-1'"
        );
    }

    #[test]
    fn scan_targets_follow_request_order() {
        assert_eq!(
            resolve_scan_targets::<UserProfile>(&["email", "id"]),
            vec![Some(1), Some(0)]
        );
        assert_eq!(resolve_scan_targets::<UserProfile>(&["*"]).len(), 8);
    }
}

//! Access-token sessions.
//!
//! A login mints a fresh random access token, stores it on the user row and
//! hands out a signed session token that carries it. Requests are resolved
//! to a user by looking that access token up, so overwriting the stored
//! token revokes every outstanding session token at once without touching
//! the signing key.

use std::sync::Arc;

use chrono::Duration;
use notifier_db::{Database, DbError};
use notifier_types::UserProfile;
use rand::Rng;
use rand::distr::Alphabetic;

use crate::error::AuthError;
use crate::password::{compose_password_material, hash_password, verify_password};
use crate::token::{
    Clock, HmacKeys, SessionClaims, SystemClock, issue_session_token, verify_session_token,
};

/// Prefix of generated user ids.
const USER_ID_PREFIX: &str = "user/";

/// Random letters after the prefix.
const USER_ID_LETTERS: usize = 10;

/// Default session token lifetime in minutes.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

/// Generate a user id of the form `user/<10 random letters>`.
pub fn generate_user_id() -> String {
    let letters: String = rand::rng()
        .sample_iter(Alphabetic)
        .take(USER_ID_LETTERS)
        .map(char::from)
        .collect();
    format!("{USER_ID_PREFIX}{letters}")
}

/// Settings for [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Secret the session tokens are signed with.
    pub signing_secret: String,
    /// Lifetime of an issued session token.
    pub ttl: Duration,
    /// bcrypt cost for new password hashes.
    pub bcrypt_cost: u32,
}

impl SessionConfig {
    /// Configuration with the default lifetime and bcrypt cost.
    pub fn new(signing_secret: &str) -> Self {
        Self {
            signing_secret: signing_secret.to_owned(),
            ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Set the session token lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the bcrypt cost.
    #[must_use]
    pub const fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }
}

/// Registers users, logs them in and resolves session tokens to users.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    keys: HmacKeys,
    ttl: Duration,
    bcrypt_cost: u32,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager over `db` using wall-clock time.
    pub fn new(db: Database, config: &SessionConfig) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    /// Create a manager that reads the time from `clock`.
    pub fn with_clock(db: Database, config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            keys: HmacKeys::from_secret(config.signing_secret.as_bytes()),
            ttl: config.ttl,
            bcrypt_cost: config.bcrypt_cost,
            clock,
        }
    }

    /// The database the manager stores users in.
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Register a user. `profile.password` holds the raw secret; the stored
    /// row gets a generated id and the hash of the password material.
    ///
    /// Returns the stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MaterialTooLong`] for an overlong secret, or
    /// [`AuthError::Db`] if the insert fails (e.g. the email is taken).
    pub async fn register(&self, profile: UserProfile) -> Result<UserProfile, AuthError> {
        let material = compose_password_material(&profile.email, &profile.password);
        let user = UserProfile {
            id: generate_user_id(),
            password: hash_password(material, self.bcrypt_cost).await?,
            token: String::new(),
            ..profile
        };
        self.db.users().insert(&user).await?;
        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Log in with email and secret and return a signed session token.
    ///
    /// Each login replaces the stored access token, so earlier session
    /// tokens of the same user stop resolving.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasswordMismatch`] if the email is unknown or
    /// the secret is wrong.
    pub async fn login(&self, email: &str, secret: &str) -> Result<String, AuthError> {
        let user = match self.db.users().find_by_email(email).await {
            Ok(user) => user,
            Err(DbError::NotFound(_)) => {
                tracing::warn!("Login rejected: unknown email");
                return Err(AuthError::PasswordMismatch);
            }
            Err(err) => return Err(err.into()),
        };

        let material = compose_password_material(&user.email, secret);
        if let Err(err) = verify_password(&user.password, material).await {
            tracing::warn!(user_id = %user.id, "Login rejected: {err}");
            return Err(err);
        }

        let access_token = uuid::Uuid::new_v4().to_string();
        let stamped = UserProfile {
            token: access_token.clone(),
            ..user
        };
        self.db.users().update(&stamped, &["token"]).await?;

        let claims = SessionClaims::new(&access_token, self.clock.now(), self.ttl);
        let token = issue_session_token(&claims, self.keys.encoding())?;
        tracing::info!(user_id = %stamped.id, "User logged in");
        Ok(token)
    }

    /// Resolve an `Authentication: Bearer <token>` value to its user.
    ///
    /// # Errors
    ///
    /// Returns the verification error for a bad token, or
    /// [`AuthError::UnknownSession`] if no user holds the access token.
    pub async fn authenticate(&self, bearer: &str) -> Result<UserProfile, AuthError> {
        let claims = verify_session_token(bearer, &self.keys, self.clock.as_ref())?;
        if claims.access_token.is_empty() {
            return Err(AuthError::UnknownSession);
        }
        match self.db.users().find_by_token(&claims.access_token).await {
            Ok(user) => Ok(user),
            Err(DbError::NotFound(_)) => Err(AuthError::UnknownSession),
            Err(err) => Err(err.into()),
        }
    }

    /// Clear the stored access token of `user_id`, invalidating every
    /// session token issued to it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Db`] if the update fails.
    pub async fn revoke(&self, user_id: &str) -> Result<(), AuthError> {
        let cleared = UserProfile {
            id: user_id.to_owned(),
            ..UserProfile::default()
        };
        self.db.users().update(&cleared, &["token"]).await?;
        tracing::info!(user_id = %user_id, "Session revoked");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_have_prefix_and_ten_letters() {
        let id = generate_user_id();
        let letters = id.strip_prefix(USER_ID_PREFIX).unwrap();
        assert_eq!(letters.len(), USER_ID_LETTERS);
        assert!(letters.chars().all(|c| c.is_ascii_alphabetic()));
        assert_ne!(generate_user_id(), id);
    }

    #[test]
    fn config_builder_overrides_defaults() {
        let config = SessionConfig::new("secret")
            .with_ttl(Duration::minutes(5))
            .with_bcrypt_cost(4);
        assert_eq!(config.ttl, Duration::minutes(5));
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(SessionConfig::new("s").bcrypt_cost, bcrypt::DEFAULT_COST);
    }
}

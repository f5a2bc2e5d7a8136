//! Error types for the auth layer.

use notifier_db::DbError;

/// Errors raised while hashing credentials or issuing and checking
/// session tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The bearer value is not `Bearer <token>`.
    #[error("malformed bearer token")]
    MalformedToken,

    /// A session token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The token's expiry is not in the future.
    #[error("session token expired")]
    TokenExpired,

    /// The token is unreadable, uses an unexpected algorithm or has a bad
    /// signature.
    #[error("invalid session token: {0}")]
    TokenInvalid(String),

    /// The secret does not match the stored hash.
    #[error("password mismatch")]
    PasswordMismatch,

    /// The hashing primitive failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Password material exceeds the hashing primitive's input limit.
    #[error("password material is {0} bytes; at most 72 are accepted")]
    MaterialTooLong(usize),

    /// A verified token names an access token no user holds.
    #[error("unknown session")]
    UnknownSession,

    /// A storage call failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

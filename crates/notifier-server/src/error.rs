//! Response envelope and error types for the HTTP API.
//!
//! Every response body, success or failure, is an [`Envelope`]:
//!
//! ```json
//! { "code": 200, "success": true, "message": ... }
//! ```
//!
//! [`ApiError`] unifies the failure modes of the lower layers and converts
//! into an enveloped response via its [`IntoResponse`] implementation.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notifier_auth::AuthError;
use notifier_db::DbError;
use serde::Serialize;

/// Uniform JSON body of every response.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// HTTP status code, repeated in the body.
    pub code: u16,
    /// Whether the status is a success.
    pub success: bool,
    /// Payload on success, error text on failure.
    pub message: T,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap `message` with `status`.
    pub fn new(status: StatusCode, message: T) -> Self {
        Self {
            code: status.as_u16(),
            success: status.is_success(),
            message,
        }
    }

    /// A `200 OK` envelope.
    pub fn ok(message: T) -> Self {
        Self::new(StatusCode::OK, message)
    }

    /// A `201 Created` envelope.
    pub fn created(message: T) -> Self {
        Self::new(StatusCode::CREATED, message)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Credential or session failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A request body failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The request could not be understood.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requester does not own the target resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No `Authentication` header was sent.
    #[error("missing authentication header")]
    MissingCredentials,
}

impl ApiError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => auth_status(err),
            Self::Db(err) => db_status(err),
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) | Self::MissingCredentials => StatusCode::FORBIDDEN,
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MalformedToken
        | AuthError::TokenExpired
        | AuthError::TokenInvalid(_)
        | AuthError::UnknownSession => StatusCode::FORBIDDEN,
        AuthError::PasswordMismatch => StatusCode::UNAUTHORIZED,
        AuthError::MaterialTooLong(_) => StatusCode::BAD_REQUEST,
        AuthError::Db(db) => db_status(db),
        AuthError::Signing(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn db_status(err: &DbError) -> StatusCode {
    match err {
        DbError::NotFound(_) => StatusCode::NOT_FOUND,
        DbError::FilterRequired
        | DbError::UnknownColumn { .. }
        | DbError::NothingToUpdate(_)
        | DbError::Compose(_) => StatusCode::BAD_REQUEST,
        err if err.is_unique_violation() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        // Server-side details stay in the log.
        let message = if status.is_server_error() {
            String::from("internal error")
        } else {
            self.to_string()
        };
        Envelope::new(status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_error_kind() {
        assert_eq!(
            ApiError::Db(DbError::NotFound("users")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Auth(AuthError::PasswordMismatch).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Auth(AuthError::TokenExpired).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Auth(AuthError::UnknownSession).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::MissingCredentials.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Db(DbError::FilterRequired).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth(AuthError::Db(DbError::NotFound("users"))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Db(DbError::Config(String::from("x"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn envelope_reports_success_from_status() {
        let ok = Envelope::ok("fine");
        assert_eq!(ok.code, 200);
        assert!(ok.success);
        let created = Envelope::created(1);
        assert_eq!(created.code, 201);
        let failed = Envelope::new(StatusCode::NOT_FOUND, "gone");
        assert!(!failed.success);
    }
}

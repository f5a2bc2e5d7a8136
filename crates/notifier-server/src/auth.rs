//! Request authentication.
//!
//! Protected handlers take a [`Requester`] argument. Extracting it reads the
//! `Authentication: Bearer <token>` header (`Authorization` is accepted as a
//! fallback), verifies the session token and resolves the user holding its
//! access token. Any failure rejects the request before the handler runs.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use notifier_types::UserProfile;

use crate::error::ApiError;
use crate::state::AppState;

/// Primary header carrying the session token.
pub const AUTHENTICATION_HEADER: &str = "authentication";

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct Requester(pub UserProfile);

impl Requester {
    /// The requester's user id.
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

/// The raw bearer value, from `Authentication` or else `Authorization`.
fn bearer_value(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHENTICATION_HEADER)
        .or_else(|| headers.get(axum::http::header::AUTHORIZATION))
        .ok_or(ApiError::MissingCredentials)?;
    value
        .to_str()
        .map_err(|e| ApiError::BadRequest(format!("unreadable authentication header: {e}")))
}

impl FromRequestParts<Arc<AppState>> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let bearer = bearer_value(&parts.headers)?;
        match state.sessions.authenticate(bearer).await {
            Ok(user) => Ok(Self(user)),
            Err(err) => {
                tracing::debug!(path = %parts.uri.path(), "Authentication rejected: {err}");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;

    #[test]
    fn authentication_header_wins_over_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer second"));
        headers.insert(AUTHENTICATION_HEADER, HeaderValue::from_static("Bearer first"));
        assert_eq!(bearer_value(&headers).unwrap(), "Bearer first");
    }

    #[test]
    fn authorization_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer only"));
        assert_eq!(bearer_value(&headers).unwrap(), "Bearer only");
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(
            bearer_value(&HeaderMap::new()),
            Err(ApiError::MissingCredentials)
        ));
    }
}

//! Signed session tokens.
//!
//! A session token is an HS256 JWT whose only identity-bearing claim is an
//! opaque access token. Verifying it proves the bearer holds a token this
//! service signed and that it has not expired; who the bearer is gets
//! decided later by looking the access token up.
//!
//! Verification order:
//!
//! ```text
//! "Bearer <jwt>"  -> split (exactly two parts, scheme "Bearer")
//!                 -> read header + unverified claims
//!                 -> KeyResolver: HMAC algorithm? exp in the future? -> key
//!                 -> verify signature
//!                 -> exp in the future (again)
//! ```
//!
//! "Now" comes from a [`Clock`] so expiry can be tested with simulated time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Bearer scheme expected in front of a session token.
pub const BEARER_SCHEME: &str = "Bearer";

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Opaque access token stored on the user row.
    pub access_token: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for `access_token`, issued at `now` and valid for `ttl`.
    pub fn new(access_token: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        let expires = now.checked_add_signed(ttl).unwrap_or(now);
        Self {
            access_token: access_token.to_owned(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        }
    }

    /// Whether the expiry is strictly after `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.exp > now.timestamp()
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Second resolution.
#[derive(Debug, Default)]
pub struct FixedClock {
    secs: AtomicI64,
}

impl FixedClock {
    /// A clock stopped at `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            secs: AtomicI64::new(at.timestamp()),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.secs.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Picks the verification key for a token from its header and unverified
/// claims.
pub trait KeyResolver: Send + Sync {
    /// Return the key that must have signed this token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenInvalid`] for an unexpected algorithm and
    /// [`AuthError::TokenExpired`] when `claims.exp` is not after `now`.
    fn resolve(
        &self,
        header: &Header,
        claims: &SessionClaims,
        now: DateTime<Utc>,
    ) -> Result<DecodingKey, AuthError>;
}

/// Signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct HmacKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl HmacKeys {
    /// Keys for `secret`.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Key used to sign session tokens.
    pub const fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }
}

impl std::fmt::Debug for HmacKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HmacKeys(..)")
    }
}

impl KeyResolver for HmacKeys {
    fn resolve(
        &self,
        header: &Header,
        claims: &SessionClaims,
        now: DateTime<Utc>,
    ) -> Result<DecodingKey, AuthError> {
        if !matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::TokenInvalid(format!(
                "unexpected signing method {:?}",
                header.alg
            )));
        }
        if !claims.is_live_at(now) {
            return Err(AuthError::TokenExpired);
        }
        Ok(self.decoding.clone())
    }
}

// ---------------------------------------------------------------------------
// Issue / verify
// ---------------------------------------------------------------------------

/// Sign `claims` with HS256.
///
/// # Errors
///
/// Returns [`AuthError::Signing`] if encoding fails.
pub fn issue_session_token(claims: &SessionClaims, key: &EncodingKey) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Split `Bearer <token>` into the token.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] unless the value is exactly two
/// space-separated parts with the `Bearer` scheme.
pub fn parse_bearer(value: &str) -> Result<&str, AuthError> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedToken),
    }
}

/// Verify a `Bearer <token>` value and return its claims.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] for a bad bearer shape,
/// [`AuthError::TokenExpired`] for an expired token, and
/// [`AuthError::TokenInvalid`] for anything unreadable, unexpected or
/// badly signed.
pub fn verify_session_token<K, C>(
    bearer: &str,
    resolver: &K,
    clock: &C,
) -> Result<SessionClaims, AuthError>
where
    K: KeyResolver + ?Sized,
    C: Clock + ?Sized,
{
    let token = parse_bearer(bearer)?;
    let header = decode_header(token).map_err(|e| AuthError::TokenInvalid(e.to_string()))?;

    let mut unverified = Validation::new(header.alg);
    unverified.insecure_disable_signature_validation();
    unverified.validate_exp = false;
    let claims = decode::<SessionClaims>(token, &DecodingKey::from_secret(&[]), &unverified)
        .map_err(|e| AuthError::TokenInvalid(e.to_string()))?
        .claims;

    let key = resolver.resolve(&header, &claims, clock.now())?;

    let mut validation = Validation::new(header.alg);
    validation.validate_exp = false;
    let verified = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| AuthError::TokenInvalid(e.to_string()))?
        .claims;

    if !verified.is_live_at(clock.now()) {
        return Err(AuthError::TokenExpired);
    }
    Ok(verified)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret";

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn bearer(token: &str) -> String {
        format!("{BEARER_SCHEME} {token}")
    }

    #[test]
    fn token_is_valid_until_its_expiry() {
        let keys = HmacKeys::from_secret(SECRET);
        let clock = FixedClock::at(start());
        let claims = SessionClaims::new("access-1", clock.now(), Duration::minutes(15));
        let token = issue_session_token(&claims, keys.encoding()).unwrap();

        let verified = verify_session_token(&bearer(&token), &keys, &clock).unwrap();
        assert_eq!(verified, claims);

        clock.advance(Duration::minutes(14));
        assert!(verify_session_token(&bearer(&token), &keys, &clock).is_ok());

        clock.advance(Duration::minutes(1));
        assert!(matches!(
            verify_session_token(&bearer(&token), &keys, &clock),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn bearer_shape_is_enforced() {
        for value in ["", "Bearer", "token-only", "Bearer a b", "Basic abc", "Bearer "] {
            assert!(
                matches!(parse_bearer(value), Err(AuthError::MalformedToken)),
                "{value:?} should be malformed"
            );
        }
        assert_eq!(parse_bearer("Bearer abc").unwrap(), "abc");
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let clock = FixedClock::at(start());
        let claims = SessionClaims::new("access-1", clock.now(), Duration::minutes(5));
        let forged = issue_session_token(&claims, &EncodingKey::from_secret(b"other")).unwrap();
        assert!(matches!(
            verify_session_token(&bearer(&forged), &HmacKeys::from_secret(SECRET), &clock),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let clock = FixedClock::at(start());
        assert!(matches!(
            verify_session_token("Bearer not.a.jwt", &HmacKeys::from_secret(SECRET), &clock),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn resolver_rejects_non_hmac_algorithms() {
        let keys = HmacKeys::from_secret(SECRET);
        let claims = SessionClaims::new("access-1", start(), Duration::minutes(5));
        assert!(matches!(
            keys.resolve(&Header::new(Algorithm::RS256), &claims, start()),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(keys.resolve(&Header::new(Algorithm::HS512), &claims, start()).is_ok());
    }

    #[test]
    fn resolver_rejects_expiry_equal_to_now() {
        let keys = HmacKeys::from_secret(SECRET);
        let claims = SessionClaims::new("access-1", start(), Duration::zero());
        assert!(matches!(
            keys.resolve(&Header::default(), &claims, start()),
            Err(AuthError::TokenExpired)
        ));
    }
}

//! Password material and bcrypt hashing.
//!
//! What gets hashed is never the raw secret but the material
//! `<identity>:<secret>:<salt>`, so equal passwords of different users
//! hash from different inputs even before bcrypt adds its own salt.
//!
//! bcrypt is CPU-bound, so hashing and verification run on the blocking
//! thread pool.

use bcrypt::{hash, verify};

use crate::error::AuthError;

/// Process-wide salt mixed into every password material.
pub const MATERIAL_SALT: &str = "s+rS?:wk&FeXN88EW";

/// Largest input bcrypt reads; longer inputs would be silently cut.
pub const MAX_MATERIAL_BYTES: usize = 72;

/// Compose the bytes that are hashed for `identity` and `secret`.
pub fn compose_password_material(identity: &str, secret: &str) -> Vec<u8> {
    format!("{identity}:{secret}:{MATERIAL_SALT}").into_bytes()
}

/// Hash password material with bcrypt at the given cost.
///
/// # Errors
///
/// Returns [`AuthError::MaterialTooLong`] if the material exceeds
/// [`MAX_MATERIAL_BYTES`], or [`AuthError::Hashing`] if bcrypt fails.
pub async fn hash_password(material: Vec<u8>, cost: u32) -> Result<String, AuthError> {
    if material.len() > MAX_MATERIAL_BYTES {
        return Err(AuthError::MaterialTooLong(material.len()));
    }
    tokio::task::spawn_blocking(move || {
        hash(material, cost).map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("task join error: {e}")))?
}

/// Check password material against a stored bcrypt hash.
///
/// # Errors
///
/// Returns [`AuthError::PasswordMismatch`] if the material does not match,
/// or [`AuthError::Hashing`] if the stored hash is unreadable.
pub async fn verify_password(stored_hash: &str, material: Vec<u8>) -> Result<(), AuthError> {
    if material.len() > MAX_MATERIAL_BYTES {
        return Err(AuthError::PasswordMismatch);
    }
    let stored_hash = stored_hash.to_owned();
    let matches = tokio::task::spawn_blocking(move || {
        verify(material, &stored_hash).map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("task join error: {e}")))??;

    if matches {
        Ok(())
    } else {
        Err(AuthError::PasswordMismatch)
    }
}

//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings, so the salt and parameters travel with the hash.

use crate::error::CatalogError;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand::RngCore;
use tracing::warn;

const SALT_LEN: usize = 16;

pub fn hash_password(password: &str) -> Result<String, CatalogError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let salt =
        SaltString::encode_b64(&salt).map_err(|e| CatalogError::PasswordHash(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CatalogError::PasswordHash(e.to_string()))
}

/// `false` for a wrong password and for a stored hash that cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking pool; Argon2 is deliberately slow.
pub async fn hash_password_blocking(password: String) -> Result<String, CatalogError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CatalogError::UnexpectedError(format!("password hashing task failed: {e}")))?
}

pub async fn verify_password_blocking(
    password: String,
    stored_hash: String,
) -> Result<bool, CatalogError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| CatalogError::UnexpectedError(format!("password verify task failed: {e}")))
}

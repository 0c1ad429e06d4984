//! Argon2id password hashing with an optional server-side pepper.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored hash is malformed: {0}")]
    Malformed(String),
}

// Login verifies against this when the email is unknown so both paths cost one Argon2 run
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("escola-timing-equalizer", None).ok());

fn peppered(password: &str, pepper: Option<&str>) -> Vec<u8> {
    match pepper {
        Some(p) => format!("{p}{password}").into_bytes(),
        None => password.as_bytes().to_vec(),
    }
}

/// Hash into a PHC string (`$argon2id$...`)
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(&peppered(password, pepper), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Malformed(e.to_string()))?;

    match Argon2::default().verify_password(&peppered(password, pepper), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Malformed(e.to_string())),
    }
}

/// Burn one verification's worth of work without a real hash
pub fn verify_dummy(password: &str, pepper: Option<&str>) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash, pepper);
    }
}

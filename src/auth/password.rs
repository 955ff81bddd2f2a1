//! Password hashing and verification.
//!
//! Passwords are stored as Argon2id PHC strings, which carry their own salt
//! and cost parameters. Verification goes through `PasswordVerifier`, which
//! compares digests in constant time.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::Rng;

use super::error::HashError;

/// Salt length; the PHC recommendation for Argon2
const SALT_BYTES: usize = 16;

lazy_static! {
    /// Verified against when the login email is unknown, so that a missing
    /// account costs the same as a wrong password.
    static ref DUMMY_HASH: Option<String> = hash_password("usergate-timing-equalizer").ok();
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt_bytes: [u8; SALT_BYTES] = rand::rng().random();
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Hashing(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| HashError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(false)` on a mismatch and `Err(HashError::Malformed)` when the
/// stored hash cannot be parsed.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(hash).map_err(|e| HashError::Malformed(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(HashError::Malformed(e.to_string())),
    }
}

/// Burn the same amount of work as a real verification.
pub(crate) fn verify_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(hash, password);
    }
}

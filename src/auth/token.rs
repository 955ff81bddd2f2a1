//! Session token generation and hashing.
//!
//! Tokens are 32 random bytes, hex encoded. Only the SHA-256 digest of the
//! encoded string is ever persisted; lookups go through that digest.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

use super::error::AuthError;

/// Bytes of entropy in a session token
pub const TOKEN_BYTES: usize = 32;

/// A plaintext bearer token.
///
/// `Debug` is redacted so the value cannot leak through logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Output of [`generate`]: the plaintext, its storage hash and the expiry.
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    pub plaintext: SessionToken,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Generate a fresh token that expires `ttl` after `now`.
pub fn generate(ttl: Duration, now: DateTime<Utc>) -> Result<GeneratedToken, AuthError> {
    if ttl <= Duration::zero() {
        return Err(AuthError::InvalidTtl);
    }
    let expires_at = now.checked_add_signed(ttl).ok_or(AuthError::InvalidTtl)?;

    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    let plaintext = hex::encode(bytes);
    let hash = hash_token(&plaintext);

    Ok(GeneratedToken {
        plaintext: SessionToken(plaintext),
        hash,
        expires_at,
    })
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two token hashes in constant time
pub fn hashes_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_hash_matches_plaintext() {
        let now = Utc::now();
        let token = generate(Duration::hours(24), now).unwrap();
        assert_eq!(hash_token(token.plaintext.as_str()), token.hash);
        assert_eq!(token.expires_at, now + Duration::hours(24));
    }

    #[test]
    fn test_token_shape() {
        let token = generate(Duration::minutes(1), Utc::now()).unwrap();
        assert_eq!(token.plaintext.as_str().len(), TOKEN_BYTES * 2);
        assert!(token.plaintext.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token.hash.len(), 64);
        assert_ne!(token.hash, token.plaintext.as_str());
    }

    #[test]
    fn test_tokens_are_unique() {
        let now = Utc::now();
        let a = generate(Duration::hours(1), now).unwrap();
        let b = generate(Duration::hours(1), now).unwrap();
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let now = Utc::now();
        assert!(matches!(generate(Duration::zero(), now), Err(AuthError::InvalidTtl)));
        assert!(matches!(generate(Duration::seconds(-5), now), Err(AuthError::InvalidTtl)));
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = generate(Duration::hours(1), Utc::now()).unwrap();
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains(token.plaintext.as_str()));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_hashes_match() {
        assert!(hashes_match("abcd", "abcd"));
        assert!(!hashes_match("abcd", "abce"));
        assert!(!hashes_match("abcd", "abc"));
    }
}

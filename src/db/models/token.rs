//! Session token records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::GeneratedToken;

/// A persisted token. Holds the hash only; the plaintext never reaches the store.
#[derive(Debug, Clone, FromRow)]
pub struct Token {
    pub token_hash: String,
    pub user_id: i64,
    /// Copy of the owner's email at issue time. Not authoritative.
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn from_generated(
        generated: &GeneratedToken,
        user_id: i64,
        email: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            token_hash: generated.hash.clone(),
            user_id,
            email: email.to_string(),
            created_at: now,
            updated_at: now,
            expires_at: generated.expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Plaintext token handed to the client exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: TokenResponse,
    pub user: super::UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let token = Token {
            token_hash: "h".to_string(),
            user_id: 1,
            email: "a@b.c".to_string(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::seconds(1),
        };
        assert!(!token.is_expired(now));
        assert!(!token.is_expired(now + Duration::milliseconds(999)));
        assert!(token.is_expired(now + Duration::seconds(1)));
    }
}

//! Session lifecycle: login, validation, logout and account deactivation.
//!
//! A session moves from unauthenticated to authenticated when `login` stores
//! a token hash, and ends when the token is logged out, its owner is
//! deactivated or deleted, or it passes its expiry. Expiry is checked on
//! every validation; expired rows are removed lazily here and eagerly by
//! the sweeper.

use chrono::Duration;
use std::sync::Arc;

use super::clock::Clock;
use super::error::{AuthError, DenyReason};
use super::password;
use super::token::{self, SessionToken};
use crate::db::{Token, User};
use crate::store::{StoreError, TokenStore, UserStore};

/// Default lifetime of a session token
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// How many times a colliding token hash is regenerated before giving up
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// A token issued by `login`. The plaintext is only ever available here.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: SessionToken,
    pub record: Token,
}

#[derive(Clone)]
pub struct SessionAuthenticator {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionAuthenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            clock,
            ttl,
        }
    }

    /// Check credentials and issue a new session token.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IssuedSession, User), AuthError> {
        let user = match self.users.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                password::verify_dummy(password);
                return Err(deny(DenyReason::UnknownUser, None));
            }
        };

        if !password::verify_password(&user.password_hash, password)? {
            return Err(deny(DenyReason::BadPassword, Some(user.id)));
        }

        if !user.active {
            return Err(deny(DenyReason::Inactive, Some(user.id)));
        }

        let session = self.issue(&user).await?;
        tracing::info!(user_id = user.id, expires_at = %session.record.expires_at, "User logged in");
        Ok((session, user))
    }

    /// Generate and persist a token for `user`, regenerating on hash collision.
    pub async fn issue(&self, user: &User) -> Result<IssuedSession, AuthError> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let now = self.clock.now();
            let generated = token::generate(self.ttl, now)?;
            let record = Token::from_generated(&generated, user.id, &user.email, now);

            match self.tokens.insert_token(&record, user).await {
                Ok(()) => {
                    return Ok(IssuedSession {
                        token: generated.plaintext,
                        record,
                    })
                }
                Err(StoreError::Conflict) => {
                    tracing::warn!(
                        user_id = user.id,
                        attempt,
                        "Token hash collision, regenerating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::Conflict)
    }

    /// Resolve a presented token to its owner.
    pub async fn validate(&self, presented: &str) -> Result<User, AuthError> {
        let hash = token::hash_token(presented);

        let record = match self.tokens.lookup_by_hash(&hash).await {
            Ok(record) if token::hashes_match(&record.token_hash, &hash) => record,
            Ok(_) | Err(StoreError::NotFound) => {
                return Err(deny(DenyReason::UnknownToken, None));
            }
            Err(e) => return Err(e.into()),
        };

        if record.is_expired(self.clock.now()) {
            if let Err(e) = self.tokens.delete_by_hash(&hash).await {
                if !matches!(e, StoreError::NotFound) {
                    tracing::warn!(user_id = record.user_id, error = %e, "Failed to remove expired token");
                }
            }
            return Err(deny(DenyReason::Expired, Some(record.user_id)));
        }

        let user = self
            .users
            .find_user(record.user_id)
            .await?
            .ok_or_else(|| deny(DenyReason::UnknownUser, Some(record.user_id)))?;

        if !user.active {
            return Err(deny(DenyReason::Inactive, Some(user.id)));
        }

        Ok(user)
    }

    /// Revoke a token. Revoking an unknown token is not an error.
    pub async fn logout(&self, presented: &str) -> Result<(), AuthError> {
        let hash = token::hash_token(presented);
        match self.tokens.delete_by_hash(&hash).await {
            Ok(()) => {
                tracing::info!("Session logged out");
                Ok(())
            }
            Err(StoreError::NotFound) => {
                tracing::debug!("Logout for unknown token");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mark a user inactive and revoke every session they own.
    ///
    /// The flag is written first. If revoking the tokens then fails the user
    /// stays inactive, and `validate` rejects the leftover tokens anyway.
    pub async fn deactivate_user(&self, user_id: i64) -> Result<u64, AuthError> {
        self.users.set_active(user_id, false).await?;

        match self.tokens.delete_all_for_user(user_id).await {
            Ok(revoked) => {
                tracing::info!(user_id, revoked, "User deactivated and sessions revoked");
                Ok(revoked)
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "User deactivated but token revocation failed");
                Err(e.into())
            }
        }
    }

    /// Mark a user active again.
    ///
    /// Tokens left over from before or during the inactive period are revoked
    /// first, so reactivation never brings an old session back. If that
    /// fails the user stays inactive.
    pub async fn reactivate_user(&self, user_id: i64) -> Result<u64, AuthError> {
        let revoked = self.tokens.delete_all_for_user(user_id).await?;
        self.users.set_active(user_id, true).await?;
        tracing::info!(user_id, revoked, "User reactivated");
        Ok(revoked)
    }

    /// Remove a user and all their tokens.
    pub async fn delete_user(&self, user_id: i64) -> Result<(), AuthError> {
        let revoked = self.tokens.delete_all_for_user(user_id).await?;
        self.users.delete_user(user_id).await?;
        tracing::info!(user_id, revoked, "User deleted");
        Ok(())
    }

    /// Remove expired tokens. Returns how many were deleted.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.tokens.delete_expired(self.clock.now()).await?)
    }
}

fn deny(reason: DenyReason, user_id: Option<i64>) -> AuthError {
    match user_id {
        Some(user_id) => tracing::info!(user_id, reason = %reason, "Authentication denied"),
        None => tracing::info!(reason = %reason, "Authentication denied"),
    }
    AuthError::Unauthorized(reason)
}

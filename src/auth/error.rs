//! Error types for the session authentication core.

use std::fmt;
use thiserror::Error;

use crate::store::StoreError;

/// Failures of the password hashing layer.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("stored password hash is malformed: {0}")]
    Malformed(String),
    #[error("failed to hash password: {0}")]
    Hashing(String),
}

/// Why a credential or token was rejected.
///
/// Only ever logged. Callers outside the authenticator see a uniform
/// "unauthorized" regardless of the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    UnknownUser,
    BadPassword,
    Inactive,
    UnknownToken,
    Expired,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::UnknownUser => "unknown_user",
            DenyReason::BadPassword => "bad_password",
            DenyReason::Inactive => "inactive",
            DenyReason::UnknownToken => "unknown_token",
            DenyReason::Expired => "expired",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized ({0})")]
    Unauthorized(DenyReason),
    #[error("token ttl must be strictly positive")]
    InvalidTtl,
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("token hash collided with an existing token")]
    Conflict,
    #[error(transparent)]
    Store(StoreError),
}

impl AuthError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::Unauthorized(_))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::Conflict,
            other => AuthError::Store(other),
        }
    }
}

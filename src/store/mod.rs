//! Persistence seams for users and session tokens.
//!
//! The authenticator only talks to these traits. `SqliteStore` is the
//! production implementation; `MemoryStore` backs tests.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::{NewUser, Token, User, UserUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error("invalid reference: {0}")]
    Validation(&'static str),
    #[error("store call exceeded its deadline")]
    Timeout,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                StoreError::Validation("referenced record does not exist")
            }
            _ => StoreError::Database(err),
        }
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a token atomically. `Conflict` if the hash already exists.
    async fn insert_token(&self, token: &Token, user: &User) -> Result<(), StoreError>;
    async fn lookup_by_hash(&self, hash: &str) -> Result<Token, StoreError>;
    async fn delete_by_hash(&self, hash: &str) -> Result<(), StoreError>;
    /// Returns the number of tokens removed
    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Returns the new user's id. `Conflict` if the email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<i64, StoreError>;
    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<(), StoreError>;
    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;
    async fn set_active(&self, id: i64, active: bool) -> Result<(), StoreError>;
    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;
}

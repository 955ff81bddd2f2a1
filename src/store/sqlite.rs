//! SQLite-backed user and token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

use super::{StoreError, TokenStore, UserStore};
use crate::db::{normalize_email, NewUser, Token, User, UserUpdate};
use crate::DbPool;

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, active, created_at, updated_at";

const TOKEN_COLUMNS: &str = "token_hash, user_id, email, created_at, updated_at, expires_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
    deadline: Duration,
}

impl SqliteStore {
    pub fn new(pool: DbPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    /// Run a query under the per-call deadline
    async fn timed<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                let deadline_ms = self.deadline.as_millis() as u64;
                tracing::warn!(deadline_ms, "Store call timed out");
                Err(StoreError::Timeout)
            }
        }
    }
}

#[async_trait]
impl TokenStore for SqliteStore {
    async fn insert_token(&self, token: &Token, user: &User) -> Result<(), StoreError> {
        self.timed(
            sqlx::query(
                r#"
                INSERT INTO tokens (token_hash, user_id, email, created_at, updated_at, expires_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&token.token_hash)
            .bind(user.id)
            .bind(&user.email)
            .bind(token.created_at)
            .bind(token.updated_at)
            .bind(token.expires_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn lookup_by_hash(&self, hash: &str) -> Result<Token, StoreError> {
        let sql = format!("SELECT {} FROM tokens WHERE token_hash = ?", TOKEN_COLUMNS);
        self.timed(
            sqlx::query_as::<_, Token>(&sql)
                .bind(hash)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_by_hash(&self, hash: &str) -> Result<(), StoreError> {
        let result = self
            .timed(
                sqlx::query("DELETE FROM tokens WHERE token_hash = ?")
                    .bind(hash)
                    .execute(&self.pool),
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = self
            .timed(
                sqlx::query("DELETE FROM tokens WHERE user_id = ?")
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = self
            .timed(
                sqlx::query("DELETE FROM tokens WHERE expires_at <= ?")
                    .bind(now)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        self.timed(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool))
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        self.timed(
            sqlx::query_as::<_, User>(&sql)
                .bind(normalize_email(email))
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY last_name, first_name, id",
            USER_COLUMNS
        );
        self.timed(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool))
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<i64, StoreError> {
        let now = Utc::now();
        let result = self
            .timed(
                sqlx::query(
                    r#"
                    INSERT INTO users (email, first_name, last_name, password_hash, active, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(normalize_email(&user.email))
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(&user.password_hash)
                .bind(user.active)
                .bind(now)
                .bind(now)
                .execute(&self.pool),
            )
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<(), StoreError> {
        let result = self
            .timed(
                sqlx::query(
                    r#"
                    UPDATE users
                    SET email = ?, first_name = ?, last_name = ?, active = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(normalize_email(&update.email))
                .bind(&update.first_name)
                .bind(&update.last_name)
                .bind(update.active)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool),
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let result = self
            .timed(
                sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                    .bind(password_hash)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        let result = self
            .timed(
                sqlx::query("UPDATE users SET active = ?, updated_at = ? WHERE id = ?")
                    .bind(active)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let affected = self
            .timed(async move {
                let mut tx = pool.begin().await?;
                sqlx::query("DELETE FROM tokens WHERE user_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                let result = sqlx::query("DELETE FROM users WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(result.rows_affected())
            })
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

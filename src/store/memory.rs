//! In-process store used by tests and local tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{StoreError, TokenStore, UserStore};
use crate::db::{normalize_email, NewUser, Token, User, UserUpdate};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tokens: HashMap<String, Token>,
    next_user_id: i64,
}

/// Store keeping both tables behind one mutex, so every call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_token_deletes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `delete_by_hash` and `delete_all_for_user` fail, to exercise
    /// partial-failure paths.
    pub fn fail_token_deletes(&self, fail: bool) {
        self.fail_token_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn token_count(&self) -> usize {
        self.tables.lock().tokens.len()
    }

    fn check_delete(&self) -> Result<(), StoreError> {
        if self.fail_token_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(&self, token: &Token, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::Validation("referenced record does not exist"));
        }
        if tables.tokens.contains_key(&token.token_hash) {
            return Err(StoreError::Conflict);
        }
        let mut row = token.clone();
        row.user_id = user.id;
        row.email = user.email.clone();
        tables.tokens.insert(row.token_hash.clone(), row);
        Ok(())
    }

    async fn lookup_by_hash(&self, hash: &str) -> Result<Token, StoreError> {
        self.tables
            .lock()
            .tokens
            .get(hash)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_hash(&self, hash: &str) -> Result<(), StoreError> {
        self.check_delete()?;
        self.tables
            .lock()
            .tokens
            .remove(hash)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        self.check_delete()?;
        let mut tables = self.tables.lock();
        let before = tables.tokens.len();
        tables.tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tables.tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let before = tables.tokens.len();
        tables.tokens.retain(|_, t| !t.is_expired(now));
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.tables.lock().users.values().cloned().collect();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(users)
    }

    async fn create_user(&self, user: &NewUser) -> Result<i64, StoreError> {
        let email = normalize_email(&user.email);
        let mut tables = self.tables.lock();
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict);
        }
        tables.next_user_id += 1;
        let id = tables.next_user_id;
        let now = Utc::now();
        tables.users.insert(
            id,
            User {
                id,
                email,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                password_hash: user.password_hash.clone(),
                active: user.active,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<(), StoreError> {
        let email = normalize_email(&update.email);
        let mut tables = self.tables.lock();
        if tables.users.values().any(|u| u.email == email && u.id != id) {
            return Err(StoreError::Conflict);
        }
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.email = email;
        user.first_name = update.first_name.clone();
        user.last_name = update.last_name.clone();
        user.active = update.active;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.active = active;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        tables.users.remove(&id).ok_or(StoreError::NotFound)?;
        tables.tokens.retain(|_, t| t.user_id != id);
        Ok(())
    }
}

//! Database seeders for initial data
//!
//! Creates the first administrator from configuration so a fresh install
//! has someone who can log in.

use anyhow::{Context, Result};
use tracing::info;

use super::NewUser;
use crate::auth::hash_password;
use crate::config::AuthConfig;
use crate::store::{StoreError, UserStore};

/// Create the configured admin user unless one with that email exists.
///
/// Returns the id of the created user, or `None` when nothing was done.
pub async fn ensure_admin_user(users: &dyn UserStore, config: &AuthConfig) -> Result<Option<i64>> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        info!("No admin credentials configured, skipping admin seed");
        return Ok(None);
    };

    if users.find_user_by_email(email).await?.is_some() {
        info!("Admin user already exists");
        return Ok(None);
    }

    let password_hash = hash_password(password).context("Failed to hash admin password")?;
    let new_user = NewUser {
        email: email.clone(),
        first_name: config.admin_first_name.clone(),
        last_name: config.admin_last_name.clone(),
        password_hash,
        active: true,
    };

    match users.create_user(&new_user).await {
        Ok(id) => {
            info!(user_id = id, "Created admin user");
            Ok(Some(id))
        }
        // lost a race with another instance seeding the same email
        Err(StoreError::Conflict) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::store::MemoryStore;

    fn config() -> AuthConfig {
        AuthConfig {
            admin_email: Some("Admin@Example.com".to_string()),
            admin_password: Some("correct-horse".to_string()),
            ..AuthConfig::default()
        }
    }

    #[tokio::test]
    async fn test_seeds_admin_once() {
        let store = MemoryStore::new();
        let id = ensure_admin_user(&store, &config()).await.unwrap();
        assert!(id.is_some());
        assert!(ensure_admin_user(&store, &config()).await.unwrap().is_none());

        let admin = store.find_user_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(admin.active);
        assert!(verify_password(&admin.password_hash, "correct-horse").unwrap());
    }

    #[tokio::test]
    async fn test_skips_without_credentials() {
        let store = MemoryStore::new();
        let id = ensure_admin_user(&store, &AuthConfig::default()).await.unwrap();
        assert!(id.is_none());
        assert!(store.list_users().await.unwrap().is_empty());
    }
}

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod store;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::auth::{Clock, SessionAuthenticator, SystemClock};
use crate::store::{TokenStore, UserStore};

pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub auth: SessionAuthenticator,
}

impl AppState {
    pub fn new<S>(config: Config, store: Arc<S>) -> Self
    where
        S: UserStore + TokenStore + 'static,
    {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build the state with an explicit time source
    pub fn with_clock<S>(config: Config, store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: UserStore + TokenStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let tokens: Arc<dyn TokenStore> = store;
        let auth = SessionAuthenticator::new(users.clone(), tokens, clock, config.token_ttl());
        Self {
            config,
            users,
            auth,
        }
    }
}

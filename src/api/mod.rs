pub mod auth;
pub mod error;
mod users;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::AppState;

/// Largest request body accepted by any endpoint
pub const MAX_BODY_BYTES: usize = 1_048_576;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Session routes (public)
    let user_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    // Protected admin routes
    let admin_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/users/save", post(users::save_user))
        .route("/users/delete", post(users::delete_user))
        .route(
            "/log-user-out/:id",
            post(users::log_user_out_and_set_inactive),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/validate-token", post(auth::validate_token))
        .nest("/users", user_routes)
        .nest("/admin", admin_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer. A `*` entry allows any origin without credentials;
/// an explicit origin list allows credentials.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age_secs));

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins).allow_credentials(true)
}

async fn health_check() -> &'static str {
    "OK"
}

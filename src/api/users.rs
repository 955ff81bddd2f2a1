//! Administrative user management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::ApiJson;
use super::error::ApiError;
use super::validation::validate_save_user;
use crate::auth::{hash_password, AuthError};
use crate::db::{
    DeleteUserRequest, MessageResponse, NewUser, SaveUserRequest, SaveUserResponse, User,
    UserResponse, UserUpdate,
};
use crate::store::StoreError;
use crate::AppState;

/// List all users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get a single user by ID
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state, id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Create a user (`id` absent or 0) or edit an existing one.
///
/// Changes to `active` go through the authenticator, so deactivating or
/// reactivating a user also revokes their existing sessions.
pub async fn save_user(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SaveUserRequest>,
) -> Result<(StatusCode, Json<SaveUserResponse>), ApiError> {
    validate_save_user(&req).finish()?;

    let password = req.password.as_deref().filter(|p| !p.is_empty());

    if req.id == 0 {
        let password = password.ok_or_else(|| ApiError::bad_request("Password is required"))?;
        let new_user = NewUser {
            email: req.email.clone(),
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            password_hash: hash_password(password).map_err(AuthError::from)?,
            active: req.active.unwrap_or(true),
        };

        let id = state
            .users
            .create_user(&new_user)
            .await
            .map_err(email_conflict)?;
        tracing::info!(user_id = id, "Created user");

        let user = load_user(&state, id).await?;
        return Ok((
            StatusCode::CREATED,
            Json(SaveUserResponse {
                message: "User created successfully".to_string(),
                user: UserResponse::from(user),
            }),
        ));
    }

    let existing = load_user(&state, req.id).await?;
    let active = req.active.unwrap_or(existing.active);

    let update = UserUpdate {
        email: req.email.clone(),
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
        // status changes go through the authenticator so sessions follow them
        active: existing.active,
    };
    state
        .users
        .update_user(existing.id, &update)
        .await
        .map_err(email_conflict)?;

    match (existing.active, active) {
        (true, false) => {
            state.auth.deactivate_user(existing.id).await?;
        }
        (false, true) => {
            state.auth.reactivate_user(existing.id).await?;
        }
        _ => {}
    }

    if let Some(password) = password {
        let hash = hash_password(password).map_err(AuthError::from)?;
        state.users.set_password_hash(existing.id, &hash).await?;
        tracing::info!(user_id = existing.id, "Password reset");
    }

    tracing::info!(user_id = existing.id, "Updated user");

    let user = load_user(&state, existing.id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SaveUserResponse {
            message: "User changes saved successfully".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

/// Delete a user and every session they own
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<DeleteUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.delete_user(req.id).await.map_err(user_not_found)?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// Deactivate a user and revoke all of their sessions
pub async fn log_user_out_and_set_inactive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state.auth.deactivate_user(id).await.map_err(user_not_found)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new("User logged out and set to inactive")),
    ))
}

async fn load_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    state
        .users
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

fn user_not_found(err: AuthError) -> ApiError {
    match err {
        AuthError::Store(StoreError::NotFound) => ApiError::not_found("User not found"),
        other => other.into(),
    }
}

fn email_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict => ApiError::conflict("A user with this email already exists"),
        StoreError::NotFound => ApiError::not_found("User not found"),
        other => other.into(),
    }
}

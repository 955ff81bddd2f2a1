use axum::{
    body::Body,
    extract::{FromRequest, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{
    LoginRequest, LoginResponse, MessageResponse, TokenRequest, TokenResponse, User, UserResponse,
    ValidateResponse,
};
use crate::AppState;

/// JSON body extractor whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// The user behind the bearer token of the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (session, user) = state.auth.login(&request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        token: TokenResponse {
            token: session.token.into_string(),
            expires_at: session.record.expires_at,
        },
        user: UserResponse::from(user),
    }))
}

/// Logout endpoint. Succeeds whether or not the token was still live.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.logout(&request.token).await?;
    Ok(Json(MessageResponse::new("Logout successful")))
}

/// Validate token endpoint
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    match state.auth.validate(&request.token).await {
        Ok(_) => Ok(Json(ValidateResponse { valid: true })),
        Err(e) if e.is_unauthorized() => Ok(Json(ValidateResponse { valid: false })),
        Err(e) => Err(e.into()),
    }
}

/// Current user endpoint
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Extract the bearer token from request headers
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Auth middleware that validates bearer tokens and exposes the owner
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .map(str::to_owned)
        .ok_or_else(ApiError::unauthorized)?;
    let user = state.auth.validate(&token).await?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_token(&headers), Some("abc123"));

        headers.insert("Authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token(&headers), None);
    }
}

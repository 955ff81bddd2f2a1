//! Unified API error handling.
//!
//! Every failure leaves the service as a JSON body of the form
//! `{"error": {"code": ..., "message": ...}}`. Authentication failures all
//! share one message, and storage errors never carry driver text.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::auth::AuthError;
use crate::store::StoreError;

/// Message returned for every authentication failure
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid credentials";

const INTERNAL_MESSAGE: &str = "An internal error occurred";
const UNAVAILABLE_MESSAGE: &str = "The service is temporarily unavailable";

pub type FieldErrors = HashMap<String, Vec<String>>;

/// Machine-readable error kinds, serialized in snake_case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    ValidationError,
    Unauthorized,
    NotFound,
    Conflict,
    InternalError,
    DatabaseError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

/// Wire envelope for every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        self.details.as_ref()
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// 401 with the shared credentials message
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, UNAUTHORIZED_MESSAGE)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// 400 carrying per-field messages. With a single failing field its
    /// first message becomes the top-level message.
    pub fn validation(errors: FieldErrors) -> Self {
        let message = match errors.len() {
            1 => errors
                .values()
                .flat_map(|messages| messages.first())
                .next()
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string()),
            n => format!("Validation failed for {} fields", n),
        };

        Self {
            code: ErrorCode::ValidationError,
            message,
            details: Some(errors),
        }
    }

    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, INTERNAL_MESSAGE)
    }

    pub fn unavailable() -> Self {
        Self::new(ErrorCode::ServiceUnavailable, UNAVAILABLE_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.code)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("Resource not found"),
            StoreError::Conflict => ApiError::conflict("Resource already exists"),
            StoreError::Validation(what) => {
                tracing::debug!(what, "Store rejected a reference");
                ApiError::bad_request("Referenced resource does not exist")
            }
            StoreError::Timeout => {
                tracing::error!("Store deadline exceeded");
                ApiError::unavailable()
            }
            StoreError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "A database error occurred")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            // reason already logged by the authenticator
            AuthError::Unauthorized(_) => ApiError::unauthorized(),
            AuthError::Store(e) => e.into(),
            AuthError::InvalidTtl => {
                tracing::error!("Token TTL is not positive");
                ApiError::internal()
            }
            AuthError::Hash(e) => {
                tracing::error!(error = %e, "Password hash failure");
                ApiError::internal()
            }
            AuthError::Conflict => {
                tracing::error!("Could not issue a unique token");
                ApiError::unavailable()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::bad_request("Invalid request payload")
    }
}

/// Collects field errors before turning them into one `ApiError`
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: FieldErrors,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{DenyReason, HashError};

    #[test]
    fn test_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCode::ServiceUnavailable).unwrap();
        assert_eq!(json, "\"service_unavailable\"");
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_all_deny_reasons_look_the_same() {
        let reasons = [
            DenyReason::UnknownUser,
            DenyReason::BadPassword,
            DenyReason::Inactive,
            DenyReason::UnknownToken,
            DenyReason::Expired,
        ];
        for reason in reasons {
            let err = ApiError::from(AuthError::Unauthorized(reason));
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.message(), UNAUTHORIZED_MESSAGE);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = ApiError::from(AuthError::Hash(HashError::Malformed("salt too short".into())));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("salt"));

        let err = ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.message(), "A database error occurred");
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(StoreError::Conflict).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(StoreError::Validation("user_id")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::Timeout).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_validation_error_builder() {
        let mut builder = ValidationErrorBuilder::new();
        builder.add("email", "Invalid email format");
        builder.add("password", "Password is required");
        builder.add("email", "Email is too long");

        let err = builder.finish().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.message().contains("2 fields"));

        let details = err.details().unwrap();
        assert_eq!(details["email"].len(), 2);
        assert_eq!(details["password"].len(), 1);
    }

    #[test]
    fn test_single_field_validation_message() {
        let mut builder = ValidationErrorBuilder::new();
        builder.add("email", "Email is required");
        let err = builder.finish().unwrap_err();
        assert_eq!(err.message(), "Email is required");
    }
}

//! Input validation for API requests.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::ValidationErrorBuilder;
use crate::db::SaveUserRequest;

/// Minimum password length accepted for new or reset passwords
pub const MIN_PASSWORD_LENGTH: usize = 8;

lazy_static! {
    /// Loose email shape check; deliverability is not our concern
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a first or last name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.len() > 255 {
        return Err("Name is too long (max 255 characters)".to_string());
    }
    Ok(())
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > 1024 {
        return Err("Password is too long (max 1024 characters)".to_string());
    }
    Ok(())
}

/// Check a create/edit request. Creation requires a password.
pub fn validate_save_user(req: &SaveUserRequest) -> ValidationErrorBuilder {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_name(&req.first_name) {
        errors.add("first_name", e);
    }
    if let Err(e) = validate_name(&req.last_name) {
        errors.add("last_name", e);
    }

    match req.password.as_deref() {
        Some(password) if !password.is_empty() => {
            if let Err(e) = validate_password(password) {
                errors.add("password", e);
            }
        }
        _ if req.id == 0 => {
            errors.add("password", "Password is required");
        }
        _ => {}
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: i64, email: &str, password: Option<&str>) -> SaveUserRequest {
        SaveUserRequest {
            id,
            email: email.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            password: password.map(str::to_string),
            active: None,
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email(" alice@example.com ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("alice@localhost").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("correct-horse").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_create_requires_password() {
        assert!(!validate_save_user(&request(0, "alice@example.com", None)).is_empty());
        assert!(!validate_save_user(&request(0, "alice@example.com", Some(""))).is_empty());
        let complete = request(0, "alice@example.com", Some("correct-horse"));
        assert!(validate_save_user(&complete).is_empty());
    }

    #[test]
    fn test_edit_password_is_optional() {
        assert!(validate_save_user(&request(3, "alice@example.com", None)).is_empty());
        assert!(validate_save_user(&request(3, "alice@example.com", Some(""))).is_empty());
        assert!(!validate_save_user(&request(3, "alice@example.com", Some("short"))).is_empty());
    }
}

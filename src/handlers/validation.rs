//! Input validation shared by registration and profile/admin updates.
//!
//! Every path that can set a username or password goes through these checks
//! so the rules cannot drift between endpoints.

use crate::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 3 {
        return Err(ApiError::bad_request("Username must be at least 3 characters"));
    }
    if username.len() > 50 {
        return Err(ApiError::bad_request("Username must be less than 50 characters"));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, underscore, and hyphen",
        ));
    }
    if !username.chars().next().is_some_and(|c| c.is_alphanumeric()) {
        return Err(ApiError::bad_request("Username must start with a letter or number"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

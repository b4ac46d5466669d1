//! Request and response schemas for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::database::models::user::User;

/// Registration input. Scopes are deliberately absent: new accounts always
/// start with the default scope, and only admins can grant more.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: String,
}

/// Login form body (`application/x-www-form-urlencoded`).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Public view of a user record. Never includes the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub disabled: bool,
    pub scopes: Vec<String>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            disabled: user.disabled,
            scopes: user.scopes,
        }
    }
}

/// Fields a user may change on their own profile.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Self-service password change.
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Admin-only update; may also flip `disabled` and rewrite scopes.
#[derive(Debug, Deserialize)]
pub struct AdminUserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub disabled: Option<bool>,
    pub scopes: Option<Vec<String>>,
}

/// Pagination for user listings.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A stored user record.
///
/// Deliberately does not implement `Serialize`: the password hash must never
/// reach a response body or a log line. API responses go through
/// `types::UserOut` instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub hashed_password: String,
    pub full_name: Option<String>,
    /// Soft-disable flag; user records are never physically deleted.
    pub disabled: bool,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub disabled: bool,
    pub scopes: Vec<String>,
}

/// Partial update applied to an existing user. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub disabled: Option<bool>,
    pub scopes: Option<Vec<String>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.full_name.is_none()
            && self.disabled.is_none()
            && self.scopes.is_none()
    }
}

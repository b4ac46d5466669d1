//! Scope-based authorization decisions.
//!
//! The guard trusts the claims of a successfully validated token for the
//! token's whole lifetime and never consults the credential store. Scope
//! revocation therefore only takes effect at the next login; deployments
//! needing stronger guarantees must shorten the token lifetime.

use crate::auth::token::Claims;
use crate::auth::AuthError;

/// Well-known scope names.
pub mod scopes {
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}

/// Outcome of an authorization check. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationDecision {
    Allow,
    Deny { missing: Vec<String> },
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow)
    }

    /// Convert a denial into the corresponding error.
    pub fn require(self) -> Result<(), AuthError> {
        match self {
            AuthorizationDecision::Allow => Ok(()),
            AuthorizationDecision::Deny { missing } => Err(AuthError::InsufficientScope(missing.join(" "))),
        }
    }
}

/// Allow iff every entry of `required_scopes` is present in the claims.
///
/// An empty `required_scopes` allows any successfully validated identity,
/// which is the contract for ordinary authenticated endpoints.
pub fn authorize(claims: &Claims, required_scopes: &[&str]) -> AuthorizationDecision {
    let missing: Vec<String> = required_scopes
        .iter()
        .filter(|required| !claims.scopes.iter().any(|held| held == *required))
        .map(|s| s.to_string())
        .collect();

    if missing.is_empty() {
        AuthorizationDecision::Allow
    } else {
        AuthorizationDecision::Deny { missing }
    }
}

// Authentication and authorization core: password hashing, token
// issuance/validation, and scope-based access decisions.

pub mod guard;
pub mod password;
pub mod token;

use thiserror::Error;

/// Failures produced by the authentication core.
///
/// Token rejections (`InvalidSignature`, `Malformed`, `Expired`) and scope
/// denials are terminal for a request; retrying the same check can never
/// succeed. None of these variants ever carry a raw token or password.
#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    /// Bad username/password pair. Deliberately generic so responses do not
    /// reveal whether the username exists.
    #[error("Incorrect username or password")]
    AuthenticationFailed,

    /// Token signature did not verify, or the token claims a different
    /// signing algorithm than the one configured.
    #[error("Token signature verification failed")]
    InvalidSignature,

    /// Token structure is invalid or required claims are missing.
    #[error("Token is malformed")]
    Malformed,

    /// Token expiry has passed.
    #[error("Token has expired")]
    Expired,

    /// Valid token, but it does not carry every required scope.
    #[error("Not enough permissions: missing scope '{0}'")]
    InsufficientScope(String),

    /// Signing key or algorithm configuration is unusable.
    #[error("Invalid token signing configuration: {0}")]
    InvalidKey(String),

    /// Token could not be produced (e.g. empty identity).
    #[error("Token could not be issued: {0}")]
    Issuance(String),

    /// Password hashing failed internally. Verification never returns this:
    /// it fails closed to a non-match instead.
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

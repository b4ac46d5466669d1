//! Password hashing and verification on top of bcrypt.
//!
//! bcrypt produces salted, adaptive hashes and performs a constant-time
//! comparison internally, so a mismatch takes the same time regardless of
//! where the passwords differ.

use crate::auth::AuthError;

/// Hash a plaintext password with the given bcrypt work factor.
///
/// The cost factor comes from configuration; bcrypt is intentionally slow,
/// so callers on a request path should run this on a blocking thread.
pub fn hash(plaintext: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(plaintext, cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a plaintext password against a stored bcrypt hash.
///
/// Fails closed: any internal error (unparseable hash, unsupported version)
/// is reported as a non-match, never as a match.
pub fn verify(plaintext: &str, hashed: &str) -> bool {
    bcrypt::verify(plaintext, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost, keeps the tests fast
    const COST: u32 = 4;

    #[test]
    fn matching_password_verifies() {
        let hashed = hash("Secr3t!", COST).unwrap();
        assert!(verify("Secr3t!", &hashed));
    }

    #[test]
    fn single_byte_difference_fails() {
        let hashed = hash("Secr3t!", COST).unwrap();
        assert!(!verify("Secr3t?", &hashed));
        assert!(!verify("secr3t!", &hashed));
        assert!(!verify("Secr3t", &hashed));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("Secr3t!", COST).unwrap();
        let b = hash("Secr3t!", COST).unwrap();
        assert_ne!(a, b);
        assert!(verify("Secr3t!", &a));
        assert!(verify("Secr3t!", &b));
    }

    #[test]
    fn garbage_hash_fails_closed() {
        assert!(!verify("Secr3t!", "not-a-bcrypt-hash"));
        assert!(!verify("Secr3t!", ""));
    }
}

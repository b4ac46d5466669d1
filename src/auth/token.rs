//! Access token issuance and validation.
//!
//! `TokenService` owns the signing key material, loaded once at startup and
//! read-only afterwards. It is constructed explicitly and passed through
//! application state rather than read from a global, so multiple services
//! with different keys can coexist in one process.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::config::SecurityConfig;

/// Decoded, verified token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated username.
    pub sub: String,
    /// Scopes granted at issuance time. A snapshot: revocations only take
    /// effect once the token expires and a new one is issued.
    #[serde(default)]
    pub scopes: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token plus its expiry metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
    pub expires_in_secs: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, algorithm: Algorithm, lifetime: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidKey("signing secret is empty".to_string()));
        }
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::InvalidKey(format!(
                "unsupported algorithm {:?}, expected an HMAC variant",
                algorithm
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            lifetime,
        })
    }

    /// Build the service from the security section of the app configuration.
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        let algorithm = match security.jwt_algorithm.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(AuthError::InvalidKey(format!("unknown signing algorithm '{}'", other)));
            }
        };
        Self::new(
            &security.jwt_secret,
            algorithm,
            Duration::minutes(security.token_lifetime_minutes),
        )
    }

    /// Sign a token asserting `identity` and `scopes`, valid from `now` for
    /// the configured lifetime. Pure computation, no state is persisted.
    pub fn issue(&self, identity: &str, scopes: &[String], now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        if identity.is_empty() {
            return Err(AuthError::Issuance("identity must not be empty".to_string()));
        }

        let iat = now.timestamp();
        let exp = (now + self.lifetime).timestamp();
        let claims = Claims {
            sub: identity.to_string(),
            scopes: scopes.to_vec(),
            iat,
            exp,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Issuance(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            expires_in_secs: exp - iat,
        })
    }

    /// Verify a token and return its claims.
    ///
    /// Checks in order: signature integrity (including that the header
    /// algorithm matches the configured one), structural well-formedness,
    /// then expiry against the caller-supplied `now`.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below against the injected clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(map_decode_error)?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::Malformed);
        }
        if now.timestamp() >= data.claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(data.claims)
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        // InvalidAlgorithm covers tokens whose header claims a different
        // signing algorithm than the configured one (algorithm confusion)
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed,
    }
}

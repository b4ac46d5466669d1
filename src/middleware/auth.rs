use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::auth::guard::{self, scopes};
use crate::auth::token::Claims;
use crate::error::ApiError;
use crate::AppState;

/// Authenticated caller context extracted from a validated token.
///
/// Carries only what the token asserted at issuance; the credential store is
/// not consulted again until the next login.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn identity(&self) -> &str {
        &self.claims.sub
    }

    pub fn scopes(&self) -> &[String] {
        &self.claims.scopes
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { claims }
    }
}

/// Token validation middleware: extracts the bearer token, validates it and
/// injects an `AuthUser` into the request.
///
/// An invalid, expired or malformed token terminates the request with 401;
/// there is no retry path, the caller must log in again.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;

    let claims = state.tokens.validate(&token, Utc::now()).map_err(|err| {
        // Log the rejection reason only, never the token itself
        tracing::warn!("token rejected: {}", err);
        ApiError::from(err)
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Scope check for admin routes, layered after `jwt_auth_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::internal_server_error("Authentication middleware must run before scope checks"))?;

    guard::authorize(&auth_user.claims, &[scopes::ADMIN])
        .require()
        .map_err(|err| {
            tracing::warn!("admin access denied for '{}': {}", auth_user.identity(), err);
            ApiError::from(err)
        })?;

    Ok(next.run(request).await)
}

/// Extract the token from a `Authorization: Bearer <token>` header.
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(ApiError::unauthorized("Authorization header must use Bearer token format"));
    };

    if token.trim().is_empty() {
        return Err(ApiError::unauthorized("Empty bearer token"));
    }
    Ok(token.to_string())
}

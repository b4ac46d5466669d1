use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Form,
};
use chrono::Utc;

use crate::auth::guard::scopes;
use crate::auth::{password, AuthError};
use crate::config;
use crate::database::models::user::NewUser;
use crate::error::ApiError;
use crate::handlers::validation::{validate_password, validate_username};
use crate::types::{LoginRequest, RegisterRequest, TokenResponse, UserOut};
use crate::AppState;

/// POST /register - Create a new user account
///
/// Expected Input:
/// ```json
/// {
///   "username": "alice",
///   "email": "alice@example.com",   // optional
///   "full_name": "Alice Liddell",   // optional
///   "password": "Secr3t!pw"
/// }
/// ```
///
/// New accounts always receive the default `user` scope; clients cannot
/// self-assign scopes. Returns 201 with the created user (never the
/// password hash), 409 if the username or email is already taken.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;

    // bcrypt is deliberately slow; keep it off the async worker threads
    let cost = config::config().security.bcrypt_cost;
    let password = payload.password;
    let hashed_password = tokio::task::spawn_blocking(move || password::hash(&password, cost))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("hashing task failed: {}", e)))??;

    let user = state
        .store
        .create(NewUser {
            username: payload.username,
            email: payload.email,
            full_name: payload.full_name,
            hashed_password,
            disabled: false,
            scopes: vec![scopes::USER.to_string()],
        })
        .await?;

    tracing::info!("registered user '{}'", user.username);
    Ok((StatusCode::CREATED, Json(UserOut::from(user))))
}

/// POST /token - Authenticate and receive an access token
///
/// Accepts a form body with `username` and `password`. On success returns
/// the signed token plus its metadata:
///
/// ```json
/// {
///   "access_token": "eyJhbGciOiJIUzI1NiI...",
///   "token_type": "Bearer",
///   "expires_in": 1800
/// }
/// ```
///
/// Unknown username, wrong password and disabled account all produce the
/// same 401 response so callers cannot enumerate identities.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.store.find_by_identity(&form.username).await?;

    let Some(user) = user else {
        tracing::warn!("failed login attempt for username: {}", form.username);
        return Err(AuthError::AuthenticationFailed.into());
    };

    let supplied = form.password;
    let stored_hash = user.hashed_password.clone();
    let verified = tokio::task::spawn_blocking(move || password::verify(&supplied, &stored_hash))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("verification task failed: {}", e)))?;

    if !verified || user.disabled {
        tracing::warn!("failed login attempt for username: {}", form.username);
        return Err(AuthError::AuthenticationFailed.into());
    }

    // The token snapshots the scopes held right now
    let issued = state.tokens.issue(&user.username, &user.scopes, Utc::now())?;

    tracing::info!("issued token for '{}'", user.username);
    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in_secs,
    }))
}

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::auth::{password, AuthError};
use crate::config;
use crate::database::models::user::UserChanges;
use crate::error::ApiError;
use crate::handlers::validation::{validate_password, validate_username};
use crate::middleware::AuthUser;
use crate::types::{PasswordChange, ProfileUpdate, UserOut};
use crate::AppState;

/// GET /users/me/ - Profile of the authenticated caller
pub async fn read_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserOut>, ApiError> {
    let user = super::current_active_user(&state, &auth).await?;
    Ok(Json(UserOut::from(user)))
}

/// PUT /users/me/update/ - Update own profile fields
///
/// Only username, email and full name may be changed here; scopes and the
/// disabled flag are admin-only.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserOut>, ApiError> {
    let user = super::current_active_user(&state, &auth).await?;

    if let Some(ref username) = payload.username {
        validate_username(username)?;
    }

    let updated = state
        .store
        .update(
            user.id,
            UserChanges {
                username: payload.username,
                email: payload.email,
                full_name: payload.full_name,
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(UserOut::from(updated)))
}

/// PUT /users/me/password - Change own password
///
/// Requires the current password; the new hash replaces the stored one and
/// existing tokens remain valid until they expire.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<PasswordChange>,
) -> Result<impl IntoResponse, ApiError> {
    let user = super::current_active_user(&state, &auth).await?;

    let current = payload.current_password;
    let stored_hash = user.hashed_password.clone();
    let verified = tokio::task::spawn_blocking(move || password::verify(&current, &stored_hash))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("verification task failed: {}", e)))?;

    if !verified {
        tracing::warn!("password change rejected for '{}'", user.username);
        return Err(AuthError::AuthenticationFailed.into());
    }

    validate_password(&payload.new_password)?;

    let cost = config::config().security.bcrypt_cost;
    let new_password = payload.new_password;
    let hashed = tokio::task::spawn_blocking(move || password::hash(&new_password, cost))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("hashing task failed: {}", e)))??;

    state.store.update_password_hash(&user.username, hashed).await?;

    tracing::info!("password changed for '{}'", user.username);
    Ok(StatusCode::NO_CONTENT)
}

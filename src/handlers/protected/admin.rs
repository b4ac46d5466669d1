use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};

use crate::database::models::user::UserChanges;
use crate::error::ApiError;
use crate::handlers::validation::validate_username;
use crate::middleware::AuthUser;
use crate::types::{AdminUserUpdate, ListQuery, UserOut};
use crate::AppState;

/// GET /users/ - List users with pagination. Admins only.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users = state
        .store
        .list(query.limit.max(0), query.offset.max(0))
        .await?;
    Ok(Json(users.into_iter().map(UserOut::from).collect()))
}

/// PATCH /users/:user_id - Update any user by ID. Admins only.
///
/// May rewrite scopes and flip the disabled flag. Scope changes do not touch
/// tokens already in flight; they apply from the target's next login.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<UserOut>, ApiError> {
    if let Some(ref username) = payload.username {
        validate_username(username)?;
    }

    let updated = state
        .store
        .update(
            user_id,
            UserChanges {
                username: payload.username,
                email: payload.email,
                full_name: payload.full_name,
                disabled: payload.disabled,
                scopes: payload.scopes,
            },
        )
        .await?;

    tracing::info!("admin updated user id {}", user_id);
    Ok(Json(UserOut::from(updated)))
}

/// GET /status/ - System status. Admins only.
pub async fn system_status(Extension(auth): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "user": auth.identity(),
        "is_admin": true
    }))
}

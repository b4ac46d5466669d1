// Endpoints behind token validation. Admin handlers are additionally gated
// on the `admin` scope at the routing layer.

pub mod admin;
pub mod user;

use crate::database::models::user::User;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// Resolve the token subject to a live user record.
///
/// The token itself is trusted for its lifetime, but profile endpoints need
/// current data, so they re-read the store. A user that disappeared since
/// issuance gets 401; a soft-disabled one gets 400.
pub(crate) async fn current_active_user(state: &AppState, auth: &AuthUser) -> Result<User, ApiError> {
    let user = state
        .store
        .find_by_identity(auth.identity())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))?;

    if user.disabled {
        return Err(ApiError::bad_request("Inactive user"));
    }
    Ok(user)
}

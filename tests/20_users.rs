mod common;

use anyhow::Result;
use axum::http::StatusCode;
use scoped_auth::database::models::user::UserChanges;
use scoped_auth::database::store::UserStore;
use serde_json::json;

#[tokio::test]
async fn me_returns_current_profile() -> Result<()> {
    let harness = common::test_app().await?;
    common::register(&harness.app, "alice", "Secr3t!").await?;
    let token = common::login(&harness.app, "alice", "Secr3t!").await?;

    let (status, body) = common::send(&harness.app, common::get_authed("/users/me/", &token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["scopes"], json!(["user"]));
    assert!(body.get("hashed_password").is_none());
    Ok(())
}

#[tokio::test]
async fn update_own_profile() -> Result<()> {
    let harness = common::test_app().await?;
    common::register(&harness.app, "alice", "Secr3t!").await?;
    let token = common::login(&harness.app, "alice", "Secr3t!").await?;

    let (status, body) = common::send(
        &harness.app,
        common::json_request(
            "PUT",
            "/users/me/update/",
            Some(&token),
            json!({ "full_name": "Alice Liddell", "email": "alice@example.com" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Alice Liddell");
    assert_eq!(body["email"], "alice@example.com");
    // Untouched fields stay put
    assert_eq!(body["username"], "alice");
    assert_eq!(body["scopes"], json!(["user"]));
    Ok(())
}

#[tokio::test]
async fn profile_update_rejects_invalid_username() -> Result<()> {
    let harness = common::test_app().await?;
    common::register(&harness.app, "alice", "Secr3t!").await?;
    let token = common::login(&harness.app, "alice", "Secr3t!").await?;

    // The same username rules as registration apply to renames
    for bad in ["", "ab", "al ice", "-alice"] {
        let (status, _) = common::send(
            &harness.app,
            common::json_request(
                "PUT",
                "/users/me/update/",
                Some(&token),
                json!({ "username": bad }),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "username {:?} was accepted", bad);
    }

    // The record is unchanged
    let (status, body) = common::send(&harness.app, common::get_authed("/users/me/", &token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    Ok(())
}

#[tokio::test]
async fn profile_update_cannot_escalate_scopes() -> Result<()> {
    let harness = common::test_app().await?;
    common::register(&harness.app, "alice", "Secr3t!").await?;
    let token = common::login(&harness.app, "alice", "Secr3t!").await?;

    // Scope and disabled fields are not part of the self-service schema and
    // must be ignored if supplied
    let (status, body) = common::send(
        &harness.app,
        common::json_request(
            "PUT",
            "/users/me/update/",
            Some(&token),
            json!({ "full_name": "Alice", "scopes": ["admin"], "disabled": false }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scopes"], json!(["user"]));
    Ok(())
}

#[tokio::test]
async fn password_change_flow() -> Result<()> {
    let harness = common::test_app().await?;
    common::register(&harness.app, "alice", "Secr3t!").await?;
    let token = common::login(&harness.app, "alice", "Secr3t!").await?;

    // Wrong current password is refused
    let (status, _) = common::send(
        &harness.app,
        common::json_request(
            "PUT",
            "/users/me/password",
            Some(&token),
            json!({ "current_password": "WrongPass", "new_password": "N3wSecret" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Too-short replacement is refused
    let (status, _) = common::send(
        &harness.app,
        common::json_request(
            "PUT",
            "/users/me/password",
            Some(&token),
            json!({ "current_password": "Secr3t!", "new_password": "pw" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Correct current password succeeds
    let (status, _) = common::send(
        &harness.app,
        common::json_request(
            "PUT",
            "/users/me/password",
            Some(&token),
            json!({ "current_password": "Secr3t!", "new_password": "N3wSecret" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Old password no longer logs in; the new one does
    let (status, _) = common::send(&harness.app, common::login_request("alice", "Secr3t!")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    common::login(&harness.app, "alice", "N3wSecret").await?;
    Ok(())
}

#[tokio::test]
async fn disabled_user_is_inactive_for_profile_reads() -> Result<()> {
    let harness = common::test_app().await?;
    let created = common::register(&harness.app, "alice", "Secr3t!").await?;
    let token = common::login(&harness.app, "alice", "Secr3t!").await?;

    // Disable behind the API's back; the still-valid token now hits an
    // inactive account
    harness
        .store
        .update(
            created["id"].as_i64().unwrap(),
            UserChanges {
                disabled: Some(true),
                ..Default::default()
            },
        )
        .await?;

    let (status, body) = common::send(&harness.app, common::get_authed("/users/me/", &token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Inactive user");
    Ok(())
}

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use tower::ServiceExt;

use scoped_auth::auth::password;
use scoped_auth::auth::token::TokenService;
use scoped_auth::database::memory::MemoryUserStore;
use scoped_auth::database::models::user::NewUser;
use scoped_auth::database::store::UserStore;
use scoped_auth::{app, AppState};

pub const TEST_SECRET: &str = "integration-test-secret-key-0123456789abcdef";
// Minimum bcrypt cost keeps the suite fast
pub const BCRYPT_COST: u32 = 4;

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "RootPass1";

/// In-process application plus handles to its collaborators, so tests can
/// reach behind the HTTP surface when needed.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryUserStore>,
    pub tokens: TokenService,
}

/// Build the real router against an in-memory store, pre-seeded with an
/// admin account.
pub async fn test_app() -> Result<TestApp> {
    let store = Arc::new(MemoryUserStore::new());
    let tokens = TokenService::new(TEST_SECRET, Algorithm::HS256, Duration::minutes(30))
        .expect("test token service");

    store
        .create(NewUser {
            username: ADMIN_USERNAME.to_string(),
            email: None,
            hashed_password: password::hash(ADMIN_PASSWORD, BCRYPT_COST).expect("hash admin password"),
            full_name: None,
            disabled: false,
            scopes: vec!["admin".to_string(), "user".to_string()],
        })
        .await?;

    let state = AppState {
        store: store.clone(),
        tokens: tokens.clone(),
    };

    Ok(TestApp {
        app: app(state),
        store,
        tokens,
    })
}

/// Drive one request through the router and decode the JSON body (Null for
/// empty bodies).
pub async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub fn get_authed(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={}&password={}", username, password)))
        .unwrap()
}

/// Register a user through the API; returns the created user body.
pub async fn register(app: &Router, username: &str, password: &str) -> Result<Value> {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/register",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
    Ok(body)
}

/// Log in through the API; returns the access token.
pub async fn login(app: &Router, username: &str, password: &str) -> Result<String> {
    let (status, body) = send(app, login_request(username, password)).await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
    Ok(body["access_token"].as_str().expect("access_token").to_string())
}

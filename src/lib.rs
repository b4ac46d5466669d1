pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod types;

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::token::TokenService;
use crate::database::store::UserStore;

/// Shared application state: the credential store and the token service,
/// both constructed once at startup. The token service carries the signing
/// key explicitly so tests can run several keys side by side.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub tokens: TokenService,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        // Protected (valid token required)
        .merge(user_routes(state.clone()))
        // Admin (valid token + admin scope)
        .merge(admin_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_auth_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/token", post(auth::login))
        .route("/register", post(auth::register))
}

fn user_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::user;

    Router::new()
        .route("/users/me/", get(user::read_me))
        .route("/users/me/update/", put(user::update_me))
        .route("/users/me/password", put(user::change_password))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::jwt_auth_middleware,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::admin;

    Router::new()
        .route("/users/", get(admin::list_users))
        .route("/users/:user_id", patch(admin::update_user))
        .route("/status/", get(admin::system_status))
        // Layers run bottom-up: token validation first, then the scope check
        .route_layer(axum::middleware::from_fn(middleware::require_admin))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::jwt_auth_middleware,
        ))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Scoped Auth API",
            "version": version,
            "description": "User management microservice with JWT scope-based authorization",
            "endpoints": {
                "home": "/ (public)",
                "token": "POST /token (public - token acquisition)",
                "register": "POST /register (public)",
                "profile": "/users/me/* (protected)",
                "admin": "/users/, /users/:id, /status/ (admin scope required)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "credential store unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "store_error": e.to_string()
                }
            })),
        ),
    }
}

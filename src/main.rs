use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use scoped_auth::auth::token::TokenService;
use scoped_auth::database::memory::MemoryUserStore;
use scoped_auth::database::store::{PgUserStore, UserStore};
use scoped_auth::database::manager;
use scoped_auth::{config, app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("starting scoped-auth in {:?} mode", config.environment);

    // Signing key material is loaded once here and read-only afterwards
    let tokens = TokenService::from_config(&config.security)
        .context("token service configuration is invalid")?;

    let store: Arc<dyn UserStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = manager::connect(&url, &config.database)
                .await
                .context("failed to connect to the database")?;
            let store = PgUserStore::new(pool);
            store.migrate().await.context("schema bootstrap failed")?;
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory credential store (data is not persisted)");
            Arc::new(MemoryUserStore::new())
        }
    };

    let app = app(AppState { store, tokens });

    // Allow tests or deployments to override port via env
    let port = std::env::var("AUTH_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("scoped-auth listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

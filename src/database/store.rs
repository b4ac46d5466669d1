//! Credential store: the persistence boundary consumed by the auth core.
//!
//! Handlers talk to the `UserStore` trait so the HTTP surface can run against
//! Postgres in deployment and an in-memory map in tests.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::database::models::user::{NewUser, User, UserChanges};

/// Errors from credential store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violated; carries the conflicting field name.
    #[error("conflict on {0}")]
    Conflict(&'static str),

    /// The store could not be reached. Retryable by the caller; not a trust
    /// decision.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => match db.constraint() {
                Some("users_username_key") => StoreError::Conflict("username"),
                Some("users_email_key") => StoreError::Conflict("email"),
                _ => StoreError::Sqlx(err),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Sqlx(err),
        }
    }
}

/// Lookup and mutation operations over user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_identity(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;

    /// Apply a partial update; `None` fields are left untouched.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError>;

    async fn update_scopes(&self, username: &str, scopes: Vec<String>) -> Result<User, StoreError>;

    async fn update_password_hash(&self, username: &str, hashed_password: String) -> Result<(), StoreError>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

const SELECT_COLUMNS: &str =
    "id, username, email, hashed_password, full_name, disabled, scopes, created_at, updated_at";

/// Postgres-backed credential store.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bootstrap the users table on startup. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id              BIGSERIAL PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT UNIQUE,
                hashed_password TEXT NOT NULL,
                full_name       TEXT,
                disabled        BOOLEAN NOT NULL DEFAULT FALSE,
                scopes          TEXT[] NOT NULL DEFAULT '{}',
                created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("users table ready");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identity(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE username = $1", SELECT_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", SELECT_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, hashed_password, full_name, disabled, scopes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        // The UNIQUE constraints are the source of truth for conflicts; a
        // racing insert surfaces as StoreError::Conflict via the From impl.
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.hashed_password)
            .bind(&new_user.full_name)
            .bind(new_user.disabled)
            .bind(&new_user.scopes)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let query = format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            SELECT_COLUMNS
        );
        // Negative values are not valid LIMIT/OFFSET arguments in Postgres;
        // treat them as zero, matching the in-memory store.
        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        // Single statement so a concurrent update cannot interleave between a
        // read and a write; untouched fields keep their current value.
        let query = format!(
            r#"
            UPDATE users
            SET username   = COALESCE($1, username),
                email      = COALESCE($2, email),
                full_name  = COALESCE($3, full_name),
                disabled   = COALESCE($4, disabled),
                scopes     = COALESCE($5, scopes),
                updated_at = now()
            WHERE id = $6
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let updated = sqlx::query_as::<_, User>(&query)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.full_name)
            .bind(changes.disabled)
            .bind(&changes.scopes)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User with ID {} not found.", id)))?;

        Ok(updated)
    }

    async fn update_scopes(&self, username: &str, scopes: Vec<String>) -> Result<User, StoreError> {
        let query = format!(
            "UPDATE users SET scopes = $1, updated_at = now() WHERE username = $2 RETURNING {}",
            SELECT_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&scopes)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User '{}' not found.", username)))?;
        Ok(user)
    }

    async fn update_password_hash(&self, username: &str, hashed_password: String) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET hashed_password = $1, updated_at = now() WHERE username = $2")
            .bind(&hashed_password)
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("User '{}' not found.", username)));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::database::manager::health_check(&self.pool)
            .await
            .map_err(StoreError::from)
    }
}

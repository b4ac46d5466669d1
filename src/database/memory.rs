//! In-memory credential store.
//!
//! Backs the integration tests and local runs without a database
//! (`DATABASE_URL` unset). Mirrors the Postgres implementation's semantics,
//! including uniqueness of usernames and of non-null emails.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::database::models::user::{NewUser, User, UserChanges};
use crate::database::store::{StoreError, UserStore};

pub struct MemoryUserStore {
    users: RwLock<BTreeMap<i64, User>>,
    next_id: AtomicI64,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn conflict(users: &BTreeMap<i64, User>, exclude_id: Option<i64>, username: &str, email: Option<&str>) -> Option<&'static str> {
        for user in users.values() {
            if Some(user.id) == exclude_id {
                continue;
            }
            if user.username == username {
                return Some("username");
            }
            if let (Some(a), Some(b)) = (user.email.as_deref(), email) {
                if a == b {
                    return Some("email");
                }
            }
        }
        None
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_identity(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if let Some(field) = Self::conflict(&users, None, &new_user.username, new_user.email.as_deref()) {
            return Err(StoreError::Conflict(field));
        }

        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            hashed_password: new_user.hashed_password,
            full_name: new_user.full_name,
            disabled: new_user.disabled,
            scopes: new_user.scopes,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        let current = users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("User with ID {} not found.", id)))?;

        let username = changes.username.clone().unwrap_or_else(|| current.username.clone());
        let email = changes.email.clone().or_else(|| current.email.clone());
        if let Some(field) = Self::conflict(&users, Some(id), &username, email.as_deref()) {
            return Err(StoreError::Conflict(field));
        }

        let user = users.get_mut(&id).expect("checked above");
        user.username = username;
        user.email = email;
        if let Some(full_name) = changes.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(disabled) = changes.disabled {
            user.disabled = disabled;
        }
        if let Some(scopes) = changes.scopes {
            user.scopes = scopes;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn update_scopes(&self, username: &str, scopes: Vec<String>) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::NotFound(format!("User '{}' not found.", username)))?;
        user.scopes = scopes;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, username: &str, hashed_password: String) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::NotFound(format!("User '{}' not found.", username)))?;
        user.hashed_password = hashed_password;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: Option<&str>) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.map(|e| e.to_string()),
            hashed_password: "hash".to_string(),
            full_name: None,
            disabled: false,
            scopes: vec!["user".to_string()],
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let store = MemoryUserStore::new();
        let created = store.create(new_user("alice", Some("alice@example.com"))).await.unwrap();
        assert_eq!(created.id, 1);

        let found = store.find_by_identity("alice").await.unwrap().unwrap();
        assert_eq!(found.username, "alice");
        assert!(store.find_by_identity("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", None)).await.unwrap();
        let err = store.create(new_user("alice", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_but_null_emails_do_not() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", Some("a@example.com"))).await.unwrap();

        let err = store.create(new_user("bob", Some("a@example.com"))).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));

        // Multiple users without an email are fine
        store.create(new_user("carol", None)).await.unwrap();
        store.create(new_user("dave", None)).await.unwrap();
    }

    #[tokio::test]
    async fn update_scopes_replaces_the_set() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", None)).await.unwrap();

        let updated = store
            .update_scopes("alice", vec!["user".to_string(), "admin".to_string()])
            .await
            .unwrap();
        assert!(updated.has_scope("admin"));

        let err = store.update_scopes("ghost", vec![]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let store = MemoryUserStore::new();
        let created = store.create(new_user("alice", Some("a@example.com"))).await.unwrap();

        let updated = store
            .update(
                created.id,
                UserChanges {
                    full_name: Some("Alice Liddell".to_string()),
                    disabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email.as_deref(), Some("a@example.com"));
        assert_eq!(updated.full_name.as_deref(), Some("Alice Liddell"));
        assert!(updated.disabled);
    }

    #[tokio::test]
    async fn concurrent_partial_updates_do_not_lose_writes() {
        use std::sync::Arc;

        let store = Arc::new(MemoryUserStore::new());
        let created = store.create(new_user("alice", None)).await.unwrap();

        // Each update touches a different field; neither may clobber the other
        let disable = {
            let store = Arc::clone(&store);
            let id = created.id;
            tokio::spawn(async move {
                store
                    .update(id, UserChanges { disabled: Some(true), ..Default::default() })
                    .await
            })
        };
        let grant = {
            let store = Arc::clone(&store);
            let id = created.id;
            tokio::spawn(async move {
                store
                    .update(
                        id,
                        UserChanges {
                            scopes: Some(vec!["user".to_string(), "admin".to_string()]),
                            ..Default::default()
                        },
                    )
                    .await
            })
        };
        disable.await.unwrap().unwrap();
        grant.await.unwrap().unwrap();

        let user = store.find_by_id(created.id).await.unwrap().unwrap();
        assert!(user.disabled);
        assert!(user.has_scope("admin"));
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::auth::repo_types::{NewUser, Session, User};
use crate::error::StoreError;
use crate::storage::{read_json, storage_key, write_json, KeyValueStorage};

/// Session and identity store shared by the local and remote backends.
///
/// Every operation is asynchronous regardless of backing so callers never
/// change when the backend does. Concurrent writers from different runtimes
/// are last-write-wins; nothing here detects conflicts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Checks the credential and starts the runtime's session.
    /// On failure the previous session, if any, is left untouched.
    async fn login(&self, identifier: &str, credential: &str) -> Result<User, StoreError>;

    /// Clears the active session. Calling it without one is fine.
    async fn logout(&self) -> Result<(), StoreError>;

    async fn current_user(&self) -> Result<Option<User>, StoreError>;

    async fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.current_user().await?.is_some())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Fails with [`StoreError::DuplicateUsername`] on an exact username match.
    ///
    /// Callers must not assume the active session survives this call; check
    /// [`SessionStore::create_user_preserves_session`] and re-read
    /// [`SessionStore::current_user`] afterwards.
    async fn create_user(&self, input: NewUser) -> Result<User, StoreError>;

    /// Fails with [`StoreError::LastAdministrator`] before anything is removed
    /// when the target is the only admin.
    async fn delete_user(&self, id: &str) -> Result<(), StoreError>;

    fn create_user_preserves_session(&self) -> bool;
}

pub(crate) fn normalize_login<'a>(
    identifier: &'a str,
    credential: &str,
) -> Result<&'a str, StoreError> {
    let identifier = identifier.trim();
    if identifier.is_empty() || credential.is_empty() {
        return Err(StoreError::Authentication);
    }
    Ok(identifier)
}

pub(crate) fn ensure_unique_username<'a>(
    mut users: impl Iterator<Item = &'a User>,
    username: &str,
) -> Result<(), StoreError> {
    if users.any(|u| u.username == username) {
        return Err(StoreError::DuplicateUsername(username.to_string()));
    }
    Ok(())
}

pub(crate) fn ensure_not_last_admin<'a>(
    users: impl Iterator<Item = &'a User> + Clone,
    id: &str,
) -> Result<(), StoreError> {
    let target_is_admin = users.clone().any(|u| u.id == id && u.is_admin());
    if target_is_admin && users.filter(|u| u.is_admin()).count() <= 1 {
        return Err(StoreError::LastAdministrator);
    }
    Ok(())
}

/// Persisted session slot in the storage area, expiring on read.
pub(crate) struct SessionSlot {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    pub(crate) ttl: Duration,
}

impl SessionSlot {
    pub(crate) fn new(storage: Arc<dyn KeyValueStorage>, namespace: &str, ttl: Duration) -> Self {
        Self {
            storage,
            key: storage_key(namespace, "session"),
            ttl,
        }
    }

    pub(crate) async fn load(&self) -> Result<Option<Session>, StoreError> {
        let Some(session) = read_json::<Session>(self.storage.as_ref(), &self.key).await? else {
            return Ok(None);
        };
        if session.is_expired(OffsetDateTime::now_utc()) {
            debug!(user_id = %session.user.id, "session expired");
            self.clear().await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub(crate) async fn save(&self, session: &Session) -> Result<(), StoreError> {
        write_json(self.storage.as_ref(), &self.key, session).await
    }

    pub(crate) async fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove(&self.key).await
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::{seed_users, NewUser, Session, StoredUser, User};
use crate::auth::services::{
    ensure_not_last_admin, ensure_unique_username, normalize_login, SessionSlot, SessionStore,
};
use crate::error::StoreError;
use crate::storage::{read_json, storage_key, write_json, KeyValueStorage};

/// Users collection and session kept in the local storage area.
pub struct LocalSessionStore {
    storage: Arc<dyn KeyValueStorage>,
    users_key: String,
    session: SessionSlot,
    write_lock: Mutex<()>,
}

impl LocalSessionStore {
    /// Opens the store, seeding the users collection on first run.
    pub async fn open(
        storage: Arc<dyn KeyValueStorage>,
        namespace: &str,
        session_ttl: Duration,
    ) -> Result<Self, StoreError> {
        let store = Self {
            users_key: storage_key(namespace, "users"),
            session: SessionSlot::new(storage.clone(), namespace, session_ttl),
            storage,
            write_lock: Mutex::new(()),
        };
        if store.storage.get(&store.users_key).await?.is_none() {
            let seeded = seed_users()
                .into_iter()
                .map(|(user, password)| {
                    Ok(StoredUser {
                        user,
                        password_hash: hash_password(password)?,
                    })
                })
                .collect::<Result<Vec<_>, StoreError>>()?;
            store.save_users(&seeded).await?;
            info!(count = seeded.len(), "seeded users collection");
        }
        Ok(store)
    }

    async fn load_users(&self) -> Result<Vec<StoredUser>, StoreError> {
        Ok(read_json(self.storage.as_ref(), &self.users_key)
            .await?
            .unwrap_or_default())
    }

    async fn save_users(&self, users: &[StoredUser]) -> Result<(), StoreError> {
        write_json(self.storage.as_ref(), &self.users_key, users).await
    }
}

#[async_trait]
impl SessionStore for LocalSessionStore {
    #[instrument(skip(self, credential))]
    async fn login(&self, identifier: &str, credential: &str) -> Result<User, StoreError> {
        let username = normalize_login(identifier, credential)?;
        let users = self.load_users().await?;
        let Some(found) = users
            .into_iter()
            .find(|u| u.user.username == username && verify_password(credential, &u.password_hash))
        else {
            warn!(username, "login rejected");
            return Err(StoreError::Authentication);
        };

        let session = Session::start(found.user, self.session.ttl);
        self.session.save(&session).await?;
        info!(user_id = %session.user.id, "user logged in");
        Ok(session.user)
    }

    async fn logout(&self) -> Result<(), StoreError> {
        self.session.clear().await
    }

    async fn current_user(&self) -> Result<Option<User>, StoreError> {
        Ok(self.session.load().await?.map(|s| s.user))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.load_users().await?.into_iter().map(|u| u.user).collect())
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_user(&self, input: NewUser) -> Result<User, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load_users().await?;
        ensure_unique_username(users.iter().map(|u| &u.user), &input.username)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: input.username,
            name: input.name,
            role: input.role,
        };
        users.push(StoredUser {
            user: user.clone(),
            password_hash: hash_password(&input.password)?,
        });
        self.save_users(&users).await?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load_users().await?;
        ensure_not_last_admin(users.iter().map(|u| &u.user), id)?;

        let before = users.len();
        users.retain(|u| u.user.id != id);
        if users.len() == before {
            return Ok(());
        }
        self.save_users(&users).await?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    fn create_user_preserves_session(&self) -> bool {
        true
    }
}

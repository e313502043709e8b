use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::auth::repo_types::{NewUser, Session, User};
use crate::auth::services::{
    ensure_not_last_admin, ensure_unique_username, normalize_login, SessionSlot, SessionStore,
};
use crate::error::{StoreError, WriteHalf};
use crate::remote::{RemoteBackend, RemoteSession};
use crate::storage::KeyValueStorage;

pub const PROFILES_TABLE: &str = "profiles";

/// Session store backed by a remote identity service plus a profile table.
///
/// Identity and profile records are separate writes with no transaction
/// between them; `create_user` and `delete_user` compensate on failure and
/// report [`StoreError::PartialWrite`] when compensation fails too.
pub struct RemoteSessionStore {
    remote: Arc<dyn RemoteBackend>,
    session: SessionSlot,
    identity_domain: String,
    write_lock: Mutex<()>,
}

impl RemoteSessionStore {
    /// Restores a persisted session, if any, into the remote client.
    pub async fn open(
        remote: Arc<dyn RemoteBackend>,
        storage: Arc<dyn KeyValueStorage>,
        namespace: &str,
        session_ttl: Duration,
        identity_domain: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let store = Self {
            remote,
            session: SessionSlot::new(storage, namespace, session_ttl),
            identity_domain: identity_domain.into(),
            write_lock: Mutex::new(()),
        };
        if let Some(session) = store.session.load().await? {
            store.remote.set_access_token(session.access_token).await;
        }
        Ok(store)
    }

    /// Identity e-mail for a username; identifiers already shaped like an
    /// e-mail pass through.
    fn identity_email(&self, identifier: &str) -> String {
        if identifier.contains('@') {
            identifier.to_string()
        } else {
            format!("{identifier}@{}", self.identity_domain)
        }
    }

    async fn fetch_profile(&self, id: &str) -> Result<Option<User>, StoreError> {
        match self.remote.select_by_id(PROFILES_TABLE, id).await? {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn start_session(&self, user: User, remote: RemoteSession) -> Result<User, StoreError> {
        let mut session = Session::start(user, self.session.ttl);
        if remote.expires_in > 0 {
            let token_expiry = OffsetDateTime::now_utc() + Duration::seconds(remote.expires_in);
            session.expires_at = session.expires_at.min(token_expiry);
        }
        session.access_token = Some(remote.access_token);
        self.session.save(&session).await?;
        self.remote.set_access_token(session.access_token.clone()).await;
        Ok(session.user)
    }

    async fn insert_profile(&self, profile: &User) -> Result<(), StoreError> {
        let row = serde_json::to_value(profile)?;
        match self.remote.insert(PROFILES_TABLE, row.clone()).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, user_id = %profile.id, "profile insert failed, retrying once");
                self.remote.insert(PROFILES_TABLE, row).await.map(|_| ())
            }
        }
    }
}

#[async_trait]
impl SessionStore for RemoteSessionStore {
    #[instrument(skip(self, credential))]
    async fn login(&self, identifier: &str, credential: &str) -> Result<User, StoreError> {
        let identifier = normalize_login(identifier, credential)?;
        let previous = self.session.load().await?;

        let remote_session = self
            .remote
            .sign_in(&self.identity_email(identifier), credential)
            .await?;
        self.remote
            .set_access_token(Some(remote_session.access_token.clone()))
            .await;

        let profile = match self.fetch_profile(&remote_session.identity_id).await {
            Ok(Some(profile)) => profile,
            outcome => {
                // Undo the identity sign-in so the previous session stays in force.
                if let Err(e) = self.remote.sign_out(&remote_session.access_token).await {
                    warn!(error = %e, "sign-out after rejected login failed");
                }
                self.remote
                    .set_access_token(previous.and_then(|s| s.access_token))
                    .await;
                return match outcome {
                    Err(e) => Err(e),
                    _ => {
                        warn!(identity_id = %remote_session.identity_id, "identity has no profile");
                        Err(StoreError::Authentication)
                    }
                };
            }
        };

        let user = self.start_session(profile, remote_session).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    async fn logout(&self) -> Result<(), StoreError> {
        if let Some(token) = self.session.load().await?.and_then(|s| s.access_token) {
            if let Err(e) = self.remote.sign_out(&token).await {
                warn!(error = %e, "remote sign-out failed; clearing local session anyway");
            }
        }
        self.session.clear().await?;
        self.remote.set_access_token(None).await;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, StoreError> {
        let session = self.session.load().await?;
        if session.is_none() {
            self.remote.set_access_token(None).await;
        }
        Ok(session.map(|s| s.user))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = self.remote.select(PROFILES_TABLE).await?;
        Ok(rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<User>, _>>()?)
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_user(&self, input: NewUser) -> Result<User, StoreError> {
        let _guard = self.write_lock.lock().await;
        let existing = self.list_users().await?;
        ensure_unique_username(existing.iter(), &input.username)?;

        let signup = self
            .remote
            .sign_up(&self.identity_email(&input.username), &input.password)
            .await?;
        let profile = User {
            id: signup.identity_id.clone(),
            username: input.username,
            name: input.name,
            role: input.role,
        };

        if let Err(insert_err) = self.insert_profile(&profile).await {
            return match self.remote.delete_identity(&signup.identity_id).await {
                Ok(()) => {
                    warn!(error = %insert_err, "profile insert failed; identity rolled back");
                    Err(insert_err)
                }
                Err(rollback_err) => {
                    error!(
                        identity_id = %signup.identity_id,
                        error = %insert_err,
                        rollback_error = %rollback_err,
                        "identity created without profile"
                    );
                    Err(StoreError::PartialWrite {
                        completed: WriteHalf::Identity,
                        failed: WriteHalf::Profile,
                        detail: format!(
                            "identity {} has no profile: {insert_err}; rollback failed: {rollback_err}",
                            signup.identity_id
                        ),
                    })
                }
            };
        }

        // Public sign-up may hand back a session for the new user; the
        // service makes it current, so this runtime now acts as that user.
        if let Some(new_session) = signup.session {
            warn!(user_id = %profile.id, "sign-up replaced the active session");
            self.start_session(profile.clone(), new_session).await?;
        }
        info!(user_id = %profile.id, "user created");
        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let profiles = self.list_users().await?;
        ensure_not_last_admin(profiles.iter(), id)?;
        if !self.remote.can_delete_identities() {
            warn!(user_id = id, "identity deletion unavailable; nothing removed");
            return Err(StoreError::Rejected(
                "identity deletion needs the privileged service key".into(),
            ));
        }

        let profile = profiles.into_iter().find(|p| p.id == id);
        if profile.is_some() {
            self.remote.delete(PROFILES_TABLE, id).await?;
        }

        if let Err(identity_err) = self.remote.delete_identity(id).await {
            let Some(profile) = profile else {
                return Err(identity_err);
            };
            let row = serde_json::to_value(&profile)?;
            return match self.remote.insert(PROFILES_TABLE, row).await {
                Ok(_) => {
                    warn!(error = %identity_err, user_id = id, "identity delete failed; profile restored");
                    Err(identity_err)
                }
                Err(restore_err) => {
                    error!(
                        user_id = id,
                        error = %identity_err,
                        restore_error = %restore_err,
                        "profile deleted but identity kept"
                    );
                    Err(StoreError::PartialWrite {
                        completed: WriteHalf::Profile,
                        failed: WriteHalf::Identity,
                        detail: format!(
                            "profile {id} removed but identity remains: {identity_err}; restore failed: {restore_err}"
                        ),
                    })
                }
            };
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    fn create_user_preserves_session(&self) -> bool {
        false
    }
}

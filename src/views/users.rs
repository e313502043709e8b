use tracing::warn;

use crate::auth::repo_types::{NewUser, Role, User};
use crate::auth::services::SessionStore;
use crate::error::StoreError;
use crate::views::filter::search;
use crate::views::{FormState, PendingDelete};

#[derive(Debug, Clone)]
pub struct UserDraft {
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl Default for UserDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            username: String::new(),
            password: String::new(),
            role: Role::Staff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created {
        user: User,
        /// The runtime is no longer logged in as the user who submitted the form.
        session_changed: bool,
    },
    /// Shown inline; the form stays open.
    Rejected,
}

pub struct UsersView {
    users: Vec<User>,
    search: String,
    visible: Vec<User>,
    pub form: FormState<UserDraft>,
}

impl UsersView {
    pub async fn load(store: &dyn SessionStore) -> Result<Self, StoreError> {
        let mut view = Self {
            users: store.list_users().await?,
            search: String::new(),
            visible: Vec::new(),
            form: FormState::default(),
        };
        view.recompute();
        Ok(view)
    }

    fn recompute(&mut self) {
        self.visible = search(&self.users, &self.search);
    }

    pub fn visible(&self) -> &[User] {
        &self.visible
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.recompute();
    }

    pub fn open_form(&mut self) {
        self.form.open_with(UserDraft::default());
    }

    /// Submits the open form. The credential is dropped with the form on success.
    pub async fn submit(&mut self, store: &dyn SessionStore) -> Result<SubmitOutcome, StoreError> {
        let before = store.current_user().await?.map(|u| u.id);
        let draft = self.form.draft.clone();
        let input = NewUser {
            name: draft.name,
            username: draft.username,
            password: draft.password,
            role: draft.role,
        };

        match store.create_user(input).await {
            Ok(user) => {
                self.users.push(user.clone());
                self.form.close();
                self.recompute();

                let session_changed = if store.create_user_preserves_session() {
                    false
                } else {
                    store.current_user().await?.map(|u| u.id) != before
                };
                if session_changed {
                    warn!(user_id = %user.id, "creating a user switched the active session");
                }
                Ok(SubmitOutcome::Created {
                    user,
                    session_changed,
                })
            }
            Err(e) => {
                self.form.absorb(e)?;
                Ok(SubmitOutcome::Rejected)
            }
        }
    }

    pub fn request_delete(&self, id: &str) -> Option<PendingDelete> {
        self.users.iter().find(|u| u.id == id).map(|u| PendingDelete {
            id: u.id.clone(),
        })
    }

    /// `LastAdministrator` comes back as an error and the cache is untouched.
    pub async fn confirm_delete(
        &mut self,
        store: &dyn SessionStore,
        pending: PendingDelete,
    ) -> Result<(), StoreError> {
        store.delete_user(pending.id()).await?;
        self.users.retain(|u| u.id != pending.id());
        self.recompute();
        Ok(())
    }
}

//! View-side state: cached snapshots, filter criteria and the projections
//! derived from them.
//!
//! A view fetches a snapshot once, then folds each store result back into
//! its cache instead of re-listing. Projections are recomputed from the
//! cache and criteria on every change and never edited directly.

pub mod clients;
pub mod dashboard;
pub mod filter;
pub mod sales_team;
pub mod users;

use crate::entities::services::{EntityStore, Record};
use crate::error::StoreError;

pub use clients::ClientsView;
pub use dashboard::DashboardView;
pub use filter::{ClientFilter, SalesmanFilter};
pub use sales_team::SalesTeamView;
pub use users::UsersView;

/// A delete the user has been asked to confirm. Only a view hands these out,
/// and a store delete from a view needs one.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingDelete {
    id: String,
}

impl PendingDelete {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Modal form state. Invariant violations land in `error` and keep it open.
#[derive(Debug, Clone, Default)]
pub struct FormState<D> {
    pub open: bool,
    pub draft: D,
    pub error: Option<String>,
}

impl<D: Default> FormState<D> {
    pub fn open_with(&mut self, draft: D) {
        self.open = true;
        self.draft = draft;
        self.error = None;
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    /// Keeps the form open with the error shown inline when it is an
    /// invariant violation; anything else is handed back to the caller.
    pub fn absorb(&mut self, err: StoreError) -> Result<(), StoreError> {
        if err.is_invariant_violation() {
            self.error = Some(err.to_string());
            Ok(())
        } else {
            Err(err)
        }
    }
}

/// Cached snapshot of one entity collection.
#[derive(Debug, Clone)]
pub struct EntityList<R> {
    items: Vec<R>,
}

impl<R: Record> EntityList<R> {
    pub async fn fetch(store: &dyn EntityStore<R>) -> Result<Self, StoreError> {
        Ok(Self {
            items: store.list().await?,
        })
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.items.iter().find(|r| r.id() == id)
    }

    pub async fn create(&mut self, store: &dyn EntityStore<R>, draft: R::Draft) -> Result<R, StoreError> {
        let created = store.create(draft).await?;
        self.items.push(created.clone());
        Ok(created)
    }

    /// A `None` from the store means the record vanished underneath us, so
    /// the snapshot is refetched.
    pub async fn update(
        &mut self,
        store: &dyn EntityStore<R>,
        id: &str,
        patch: R::Patch,
    ) -> Result<Option<R>, StoreError> {
        match store.update(id, patch).await? {
            Some(updated) => {
                if let Some(slot) = self.items.iter_mut().find(|r| r.id() == id) {
                    *slot = updated.clone();
                } else {
                    self.items.push(updated.clone());
                }
                Ok(Some(updated))
            }
            None => {
                self.items = store.list().await?;
                Ok(None)
            }
        }
    }

    pub fn request_delete(&self, id: &str) -> Option<PendingDelete> {
        self.get(id).map(|r| PendingDelete {
            id: r.id().to_string(),
        })
    }

    pub async fn confirm_delete(
        &mut self,
        store: &dyn EntityStore<R>,
        pending: PendingDelete,
    ) -> Result<(), StoreError> {
        store.delete(&pending.id).await?;
        self.items.retain(|r| r.id() != pending.id);
        Ok(())
    }
}

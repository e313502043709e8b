use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use time::OffsetDateTime;

use crate::entities::repo_types::{
    non_empty, seed_clients, seed_salesmen, Client, ClientDraft, ClientPatch, Salesperson,
    SalespersonDraft, SalespersonPatch,
};
use crate::error::StoreError;

/// A collection the entity stores can hold.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    /// Storage-key suffix and remote table name.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
    fn from_draft(id: String, draft: Self::Draft, now: OffsetDateTime) -> Self;
    /// Shallow merge; nested structures merge field by field.
    fn apply(&mut self, patch: Self::Patch, now: OffsetDateTime);
    fn seed(now: OffsetDateTime) -> Vec<Self>;
}

/// CRUD over one collection. Missing ids are never errors: `update` yields
/// `None` and `delete` does nothing.
///
/// Concurrent writers are last-write-wins with no conflict detection.
#[async_trait]
pub trait EntityStore<R: Record>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, StoreError>;
    async fn create(&self, draft: R::Draft) -> Result<R, StoreError>;
    async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

impl Record for Client {
    type Draft = ClientDraft;
    type Patch = ClientPatch;
    const COLLECTION: &'static str = "clients";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: ClientDraft, now: OffsetDateTime) -> Self {
        Self {
            id,
            full_name: draft.full_name,
            phone: draft.phone,
            email: draft.email,
            notes: draft.notes,
            salesman_id: draft.salesman_id.and_then(non_empty),
            website: draft.website,
            social_media: draft.social_media.normalized(),
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: ClientPatch, now: OffsetDateTime) {
        if let Some(v) = patch.full_name {
            self.full_name = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.salesman_id {
            self.salesman_id = v.and_then(non_empty);
        }
        if let Some(v) = patch.website {
            self.website = v;
        }
        if let Some(social) = patch.social_media {
            self.social_media.merge(social);
        }
        self.updated_at = now;
    }

    fn seed(now: OffsetDateTime) -> Vec<Self> {
        seed_clients(now)
    }
}

impl Record for Salesperson {
    type Draft = SalespersonDraft;
    type Patch = SalespersonPatch;
    const COLLECTION: &'static str = "salesmen";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: SalespersonDraft, _now: OffsetDateTime) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
        }
    }

    fn apply(&mut self, patch: SalespersonPatch, _now: OffsetDateTime) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
    }

    fn seed(_now: OffsetDateTime) -> Vec<Self> {
        seed_salesmen()
    }
}

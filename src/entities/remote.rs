use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::entities::services::{EntityStore, Record};
use crate::error::StoreError;
use crate::remote::RemoteBackend;

/// Entity collection stored in a remote table named after the collection.
pub struct RemoteEntityStore<R> {
    remote: Arc<dyn RemoteBackend>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RemoteEntityStore<R> {
    pub fn new(remote: Arc<dyn RemoteBackend>) -> Self {
        Self {
            remote,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Record> EntityStore<R> for RemoteEntityStore<R> {
    async fn list(&self) -> Result<Vec<R>, StoreError> {
        let rows = self.remote.select(R::COLLECTION).await?;
        Ok(rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<R>, _>>()?)
    }

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        let record = R::from_draft(Uuid::new_v4().to_string(), draft, OffsetDateTime::now_utc());
        let stored = self
            .remote
            .insert(R::COLLECTION, serde_json::to_value(&record)?)
            .await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Read-modify-write: nested fields are merged here, not by the table.
    async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>, StoreError> {
        let Some(row) = self.remote.select_by_id(R::COLLECTION, id).await? else {
            debug!(collection = R::COLLECTION, id, "update of unknown record ignored");
            return Ok(None);
        };
        let mut record: R = serde_json::from_value(row)?;
        record.apply(patch, OffsetDateTime::now_utc());
        match self
            .remote
            .update(R::COLLECTION, id, serde_json::to_value(&record)?)
            .await?
        {
            Some(stored) => Ok(Some(serde_json::from_value(stored)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.remote.delete(R::COLLECTION, id).await {
            Ok(()) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

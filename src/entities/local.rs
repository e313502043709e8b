use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::services::{EntityStore, Record};
use crate::error::StoreError;
use crate::storage::{read_json, storage_key, write_json, KeyValueStorage};

/// Entity collection serialised as one JSON array in the storage area.
pub struct LocalEntityStore<R> {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> LocalEntityStore<R> {
    /// Opens the collection, writing the seed dataset when the key is absent.
    pub async fn open(storage: Arc<dyn KeyValueStorage>, namespace: &str) -> Result<Self, StoreError> {
        let store = Self {
            key: storage_key(namespace, R::COLLECTION),
            storage,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        };
        if store.storage.get(&store.key).await?.is_none() {
            let seed = R::seed(OffsetDateTime::now_utc());
            store.save(&seed).await?;
            info!(collection = R::COLLECTION, count = seed.len(), "seeded collection");
        }
        Ok(store)
    }

    async fn load(&self) -> Result<Vec<R>, StoreError> {
        Ok(read_json(self.storage.as_ref(), &self.key)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, records: &[R]) -> Result<(), StoreError> {
        write_json(self.storage.as_ref(), &self.key, records).await
    }
}

#[async_trait]
impl<R: Record> EntityStore<R> for LocalEntityStore<R> {
    async fn list(&self) -> Result<Vec<R>, StoreError> {
        self.load().await
    }

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let record = R::from_draft(Uuid::new_v4().to_string(), draft, OffsetDateTime::now_utc());
        records.push(record.clone());
        self.save(&records).await?;
        debug!(collection = R::COLLECTION, id = record.id(), "record created");
        Ok(record)
    }

    async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            debug!(collection = R::COLLECTION, id, "update of unknown record ignored");
            return Ok(None);
        };
        record.apply(patch, OffsetDateTime::now_utc());
        let updated = record.clone();
        self.save(&records).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() != before {
            self.save(&records).await?;
            debug!(collection = R::COLLECTION, id, "record deleted");
        }
        Ok(())
    }
}

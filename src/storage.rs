use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;

/// Key/value storage area backing the local store variant.
///
/// Values are opaque JSON documents; callers own the key namespace.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Namespaced key: `<namespace>_<name>`.
pub fn storage_key(namespace: &str, name: &str) -> String {
    format!("{namespace}_{name}")
}

pub async fn read_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match storage.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn write_json<T: Serialize + ?Sized>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, raw).await
}

/// One JSON file per key inside a data directory.
#[derive(Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "file storage opened");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage area, lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(storage_key("levant", "clients"), "levant_clients");
    }

    #[tokio::test]
    async fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = FileStorage::open(dir.path()).await.expect("open");
        first.set("levant_users", "[1,2]".into()).await.expect("set");

        let second = FileStorage::open(dir.path()).await.expect("reopen");
        assert_eq!(
            second.get("levant_users").await.expect("get").as_deref(),
            Some("[1,2]")
        );
    }

    #[tokio::test]
    async fn file_storage_missing_key_and_remove_are_quiet() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::open(dir.path()).await.expect("open");
        assert!(storage.get("absent").await.expect("get").is_none());
        storage.remove("absent").await.expect("remove absent");

        storage.set("k", "v".into()).await.expect("set");
        storage.remove("k").await.expect("remove");
        assert!(storage.get("k").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn json_helpers_go_through_storage() {
        let storage = MemoryStorage::new();
        write_json(&storage, "levant_numbers", &vec![3, 1, 2])
            .await
            .expect("write");
        let back: Option<Vec<i32>> = read_json(&storage, "levant_numbers").await.expect("read");
        assert_eq!(back, Some(vec![3, 1, 2]));

        storage.set("levant_bad", "{not json".into()).await.expect("set");
        let err = read_json::<Vec<i32>>(&storage, "levant_bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::local::LocalSessionStore;
use crate::auth::remote::RemoteSessionStore;
use crate::auth::services::SessionStore;
use crate::config::{AppConfig, BackendKind};
use crate::entities::local::LocalEntityStore;
use crate::entities::remote::RemoteEntityStore;
use crate::entities::repo_types::{Client, Salesperson};
use crate::entities::services::EntityStore;
use crate::remote::{HttpRemote, RemoteBackend};
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};

/// Stores for one panel runtime, built once at startup and shared by handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Arc<dyn SessionStore>,
    pub clients: Arc<dyn EntityStore<Client>>,
    pub salesmen: Arc<dyn EntityStore<Salesperson>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(
            FileStorage::open(&config.data_dir)
                .await
                .with_context(|| format!("open data dir {}", config.data_dir.display()))?,
        );
        let ns = config.storage_namespace.clone();

        let state = match config.backend {
            BackendKind::Local => {
                let session = LocalSessionStore::open(storage.clone(), &ns, config.session_ttl())
                    .await
                    .context("open local session store")?;
                let clients = LocalEntityStore::<Client>::open(storage.clone(), &ns).await?;
                let salesmen = LocalEntityStore::<Salesperson>::open(storage, &ns).await?;
                Self {
                    session: Arc::new(session),
                    clients: Arc::new(clients),
                    salesmen: Arc::new(salesmen),
                    config: Arc::new(config),
                }
            }
            BackendKind::Remote => {
                let remote_config = config
                    .remote
                    .clone()
                    .context("remote backend selected without remote settings")?;
                let remote: Arc<dyn RemoteBackend> = Arc::new(HttpRemote::new(&remote_config)?);
                let session = RemoteSessionStore::open(
                    remote.clone(),
                    storage,
                    &ns,
                    config.session_ttl(),
                    remote_config.identity_domain,
                )
                .await
                .context("open remote session store")?;
                Self {
                    session: Arc::new(session),
                    clients: Arc::new(RemoteEntityStore::<Client>::new(remote.clone())),
                    salesmen: Arc::new(RemoteEntityStore::<Salesperson>::new(remote)),
                    config: Arc::new(config),
                }
            }
        };
        info!(backend = ?state.config.backend, "stores ready");
        Ok(state)
    }

    /// Seeded in-memory local stores.
    #[cfg(test)]
    pub(crate) async fn fake() -> Self {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let config = AppConfig {
            backend: BackendKind::Local,
            data_dir: "memory".into(),
            storage_namespace: "test".into(),
            session_ttl_minutes: 60,
            remote: None,
        };
        let session = LocalSessionStore::open(storage.clone(), "test", config.session_ttl())
            .await
            .expect("memory session store");
        let clients = LocalEntityStore::<Client>::open(storage.clone(), "test")
            .await
            .expect("memory client store");
        let salesmen = LocalEntityStore::<Salesperson>::open(storage, "test")
            .await
            .expect("memory salesperson store");
        Self {
            config: Arc::new(config),
            session: Arc::new(session),
            clients: Arc::new(clients),
            salesmen: Arc::new(salesmen),
        }
    }
}

use serde::Serialize;

use crate::entities::repo_types::{Client, Salesperson};
use crate::entities::services::EntityStore;
use crate::error::StoreError;

pub const RECENT_CLIENTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub client_count: usize,
    pub salesperson_count: usize,
    /// Most recently updated first.
    pub recent_clients: Vec<Client>,
}

impl DashboardView {
    pub fn from_snapshots(clients: &[Client], salesmen: &[Salesperson]) -> Self {
        let mut recent = clients.to_vec();
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        recent.truncate(RECENT_CLIENTS);
        Self {
            client_count: clients.len(),
            salesperson_count: salesmen.len(),
            recent_clients: recent,
        }
    }

    pub async fn load(
        clients: &dyn EntityStore<Client>,
        salesmen: &dyn EntityStore<Salesperson>,
    ) -> Result<Self, StoreError> {
        let clients = clients.list().await?;
        let salesmen = salesmen.list().await?;
        Ok(Self::from_snapshots(&clients, &salesmen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::repo_types::{seed_salesmen, ClientDraft};
    use crate::entities::services::Record;
    use time::{Duration, OffsetDateTime};

    #[test]
    fn recent_clients_are_newest_five() {
        let base = OffsetDateTime::now_utc();
        let clients: Vec<Client> = (0..7)
            .map(|i| {
                Client::from_draft(
                    format!("c{i}"),
                    ClientDraft {
                        full_name: format!("Client {i}"),
                        ..Default::default()
                    },
                    base + Duration::minutes(i),
                )
            })
            .collect();

        let stats = DashboardView::from_snapshots(&clients, &seed_salesmen());
        assert_eq!(stats.client_count, 7);
        assert_eq!(stats.salesperson_count, 3);
        let ids: Vec<_> = stats.recent_clients.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c6", "c5", "c4", "c3", "c2"]);
    }

    #[test]
    fn empty_snapshots() {
        let stats = DashboardView::from_snapshots(&[], &[]);
        assert_eq!(stats.client_count, 0);
        assert!(stats.recent_clients.is_empty());
    }
}

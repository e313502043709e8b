use crate::entities::repo_types::{Client, ClientDraft, ClientPatch, Salesperson};
use crate::entities::services::EntityStore;
use crate::error::StoreError;
use crate::views::filter::{ClientFilter, SalesmanFilter};
use crate::views::{EntityList, PendingDelete};

pub const UNASSIGNED: &str = "Unassigned";

/// Client list with salesperson lookup and a filtered projection.
pub struct ClientsView {
    clients: EntityList<Client>,
    salesmen: Vec<Salesperson>,
    filter: ClientFilter,
    visible: Vec<Client>,
}

impl ClientsView {
    pub async fn load(
        clients: &dyn EntityStore<Client>,
        salesmen: &dyn EntityStore<Salesperson>,
    ) -> Result<Self, StoreError> {
        let mut view = Self {
            clients: EntityList::fetch(clients).await?,
            salesmen: salesmen.list().await?,
            filter: ClientFilter::default(),
            visible: Vec::new(),
        };
        view.recompute();
        Ok(view)
    }

    fn recompute(&mut self) {
        self.visible = self.filter.apply(self.clients.items());
    }

    pub fn visible(&self) -> &[Client] {
        &self.visible
    }

    pub fn all(&self) -> &[Client] {
        self.clients.items()
    }

    pub fn salesmen(&self) -> &[Salesperson] {
        &self.salesmen
    }

    pub fn filter(&self) -> &ClientFilter {
        &self.filter
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.filter.search = term.into();
        self.recompute();
    }

    pub fn set_salesman(&mut self, salesman: SalesmanFilter) {
        self.filter.salesman = salesman;
        self.recompute();
    }

    /// Display name for a client's salesperson; dangling ids read as unassigned.
    pub fn salesman_name(&self, id: Option<&str>) -> &str {
        id.and_then(|id| self.salesmen.iter().find(|s| s.id == id))
            .map_or(UNASSIGNED, |s| s.name.as_str())
    }

    /// New-client form default: the first salesperson, if any.
    pub fn default_draft(&self) -> ClientDraft {
        ClientDraft {
            salesman_id: self.salesmen.first().map(|s| s.id.clone()),
            ..Default::default()
        }
    }

    pub async fn add(
        &mut self,
        store: &dyn EntityStore<Client>,
        draft: ClientDraft,
    ) -> Result<Client, StoreError> {
        let created = self.clients.create(store, draft).await?;
        self.recompute();
        Ok(created)
    }

    pub async fn edit(
        &mut self,
        store: &dyn EntityStore<Client>,
        id: &str,
        patch: ClientPatch,
    ) -> Result<Option<Client>, StoreError> {
        let updated = self.clients.update(store, id, patch).await?;
        self.recompute();
        Ok(updated)
    }

    pub fn request_delete(&self, id: &str) -> Option<PendingDelete> {
        self.clients.request_delete(id)
    }

    pub async fn confirm_delete(
        &mut self,
        store: &dyn EntityStore<Client>,
        pending: PendingDelete,
    ) -> Result<(), StoreError> {
        self.clients.confirm_delete(store, pending).await?;
        self.recompute();
        Ok(())
    }
}

use crate::entities::repo_types::{Salesperson, SalespersonDraft, SalespersonPatch};
use crate::entities::services::EntityStore;
use crate::error::StoreError;
use crate::views::filter::search;
use crate::views::{EntityList, PendingDelete};

pub struct SalesTeamView {
    team: EntityList<Salesperson>,
    search: String,
    visible: Vec<Salesperson>,
}

impl SalesTeamView {
    pub async fn load(store: &dyn EntityStore<Salesperson>) -> Result<Self, StoreError> {
        let mut view = Self {
            team: EntityList::fetch(store).await?,
            search: String::new(),
            visible: Vec::new(),
        };
        view.recompute();
        Ok(view)
    }

    fn recompute(&mut self) {
        self.visible = search(self.team.items(), &self.search);
    }

    pub fn visible(&self) -> &[Salesperson] {
        &self.visible
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.recompute();
    }

    pub async fn add(
        &mut self,
        store: &dyn EntityStore<Salesperson>,
        draft: SalespersonDraft,
    ) -> Result<Salesperson, StoreError> {
        let created = self.team.create(store, draft).await?;
        self.recompute();
        Ok(created)
    }

    pub async fn edit(
        &mut self,
        store: &dyn EntityStore<Salesperson>,
        id: &str,
        patch: SalespersonPatch,
    ) -> Result<Option<Salesperson>, StoreError> {
        let updated = self.team.update(store, id, patch).await?;
        self.recompute();
        Ok(updated)
    }

    pub fn request_delete(&self, id: &str) -> Option<PendingDelete> {
        self.team.request_delete(id)
    }

    /// Clients assigned to the removed salesperson keep the dangling id.
    pub async fn confirm_delete(
        &mut self,
        store: &dyn EntityStore<Salesperson>,
        pending: PendingDelete,
    ) -> Result<(), StoreError> {
        self.team.confirm_delete(store, pending).await?;
        self.recompute();
        Ok(())
    }
}

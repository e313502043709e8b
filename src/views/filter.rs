use serde::Deserialize;

use crate::auth::repo_types::User;
use crate::entities::repo_types::{Client, Salesperson};

/// Records the free-text search looks into.
pub trait Searchable {
    fn search_fields(&self) -> [&str; 2];
}

impl Searchable for Client {
    fn search_fields(&self) -> [&str; 2] {
        [&self.full_name, &self.phone]
    }
}

impl Searchable for Salesperson {
    fn search_fields(&self) -> [&str; 2] {
        [&self.name, &self.phone]
    }
}

impl Searchable for User {
    fn search_fields(&self) -> [&str; 2] {
        [&self.name, &self.username]
    }
}

/// Case-insensitive substring match on any search field. Only an empty term
/// matches everything; whitespace is matched literally.
pub fn matches_search<T: Searchable>(item: &T, term: &str) -> bool {
    let term = term.to_lowercase();
    term.is_empty()
        || item
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
}

pub fn search<T: Searchable + Clone>(items: &[T], term: &str) -> Vec<T> {
    items
        .iter()
        .filter(|item| matches_search(*item, term))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SalesmanFilter {
    #[default]
    All,
    Only(String),
}

impl SalesmanFilter {
    /// `"all"` and the empty string both mean no restriction.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Self::All,
            Some(id) => Self::Only(id.to_string()),
        }
    }

    fn admits(&self, client: &Client) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => client.salesman_id.as_deref() == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    pub search: String,
    pub salesman: SalesmanFilter,
}

/// Query-string form of [`ClientFilter`].
#[derive(Debug, Default, Deserialize)]
pub struct ClientFilterQuery {
    pub search: Option<String>,
    pub salesman: Option<String>,
}

impl From<ClientFilterQuery> for ClientFilter {
    fn from(q: ClientFilterQuery) -> Self {
        Self {
            search: q.search.unwrap_or_default(),
            salesman: SalesmanFilter::parse(q.salesman.as_deref()),
        }
    }
}

impl ClientFilter {
    /// Salesperson restriction first, then the free-text search.
    pub fn apply(&self, clients: &[Client]) -> Vec<Client> {
        clients
            .iter()
            .filter(|c| self.salesman.admits(c))
            .filter(|c| matches_search(*c, &self.search))
            .cloned()
            .collect()
    }
}

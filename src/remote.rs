use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::StoreError;

/// Authenticated identity session issued by the remote service.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    pub identity_id: String,
    pub access_token: String,
    pub expires_in: i64,
}

/// Result of a public sign-up. Some deployments hand back a live session.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub identity_id: String,
    pub session: Option<RemoteSession>,
}

/// Backend-as-a-service surface the remote stores are written against.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<RemoteSession, StoreError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, StoreError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError>;
    /// Whether [`RemoteBackend::delete_identity`] can succeed at all.
    fn can_delete_identities(&self) -> bool;

    /// Privileged; removing an identity that no longer exists succeeds.
    async fn delete_identity(&self, identity_id: &str) -> Result<(), StoreError>;

    /// Bearer used for table calls; `None` falls back to the anonymous key.
    async fn set_access_token(&self, token: Option<String>);

    async fn select(&self, table: &str) -> Result<Vec<Value>, StoreError>;
    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError>;
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;
    async fn update(&self, table: &str, id: &str, row: Value) -> Result<Option<Value>, StoreError>;
    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    user: IdentityUser,
}

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: String,
}

/// HTTP adapter: `/auth/v1/*` for identities, `/rest/v1/<table>` for rows.
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: Option<String>,
    access_token: RwLock<Option<String>>,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn table_request(&self, method: Method, table: &str) -> RequestBuilder {
        let token = self.access_token.read().await.clone();
        let bearer = token.as_deref().unwrap_or(&self.anon_key);
        self.request(method, &format!("/rest/v1/{table}"), bearer)
    }
}

async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    debug!(%status, body = %body, "remote call failed");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => StoreError::Timeout,
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            StoreError::RemoteUnavailable(format!("{status}: {body}"))
        }
        _ => StoreError::Rejected(format!("{status}: {body}")),
    })
}

fn first_row(rows: Vec<Value>) -> Option<Value> {
    rows.into_iter().next()
}

#[async_trait]
impl RemoteBackend for HttpRemote {
    async fn sign_in(&self, email: &str, password: &str) -> Result<RemoteSession, StoreError> {
        let resp = self
            .request(Method::POST, "/auth/v1/token?grant_type=password", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if resp.status() == StatusCode::BAD_REQUEST {
            return Err(StoreError::Authentication);
        }
        let token: TokenResponse = check(resp).await?.json().await?;
        Ok(RemoteSession {
            identity_id: token.user.id,
            access_token: token.access_token,
            expires_in: token.expires_in,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, StoreError> {
        let resp = self
            .request(Method::POST, "/auth/v1/signup", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = check(resp).await?.json().await?;

        // With e-mail confirmation disabled the service answers with a full session.
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)?;
            let identity_id = token.user.id.clone();
            return Ok(SignUp {
                identity_id: identity_id.clone(),
                session: Some(RemoteSession {
                    identity_id,
                    access_token: token.access_token,
                    expires_in: token.expires_in,
                }),
            });
        }
        let user: IdentityUser = serde_json::from_value(body)?;
        Ok(SignUp {
            identity_id: user.id,
            session: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        let resp = self
            .request(Method::POST, "/auth/v1/logout", access_token)
            .send()
            .await?;
        match check(resp).await {
            Ok(_) | Err(StoreError::Unauthorized) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn can_delete_identities(&self) -> bool {
        self.service_key.is_some()
    }

    async fn delete_identity(&self, identity_id: &str) -> Result<(), StoreError> {
        let Some(service_key) = self.service_key.as_deref() else {
            warn!("identity deletion requested without a service key");
            return Err(StoreError::Rejected("service key not configured".into()));
        };
        let resp = self
            .http
            .delete(format!("{}/auth/v1/admin/users/{identity_id}", self.base_url))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .send()
            .await?;
        match check(resp).await {
            Ok(_) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    async fn select(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .table_request(Method::GET, table)
            .await
            .query(&[("select", "*")])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let resp = self
            .table_request(Method::GET, table)
            .await
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .send()
            .await?;
        let rows: Vec<Value> = check(resp).await?.json().await?;
        Ok(first_row(rows))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let resp = self
            .table_request(Method::POST, table)
            .await
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<Value> = check(resp).await?.json().await?;
        first_row(rows).ok_or_else(|| StoreError::Rejected(format!("insert into {table} returned no row")))
    }

    async fn update(&self, table: &str, id: &str, row: Value) -> Result<Option<Value>, StoreError> {
        let resp = self
            .table_request(Method::PATCH, table)
            .await
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<Value> = check(resp).await?.json().await?;
        Ok(first_row(rows))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let resp = self
            .table_request(Method::DELETE, table)
            .await
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory stand-in for the remote service with failure injection.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeRemote {
        identities: Mutex<HashMap<String, (String, String)>>,
        tables: Mutex<HashMap<String, Vec<Value>>>,
        pub token: Mutex<Option<String>>,
        pub sign_up_returns_session: AtomicBool,
        pub fail_inserts: AtomicUsize,
        pub fail_deletes: AtomicUsize,
        pub fail_identity_delete: AtomicBool,
        pub fail_identity_delete_times: AtomicUsize,
        /// No privileged key: identity deletion is refused up front.
        pub identity_delete_refused: AtomicBool,
        pub unavailable: AtomicBool,
        table_writes: AtomicUsize,
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    impl FakeRemote {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_identity(&self, id: &str, email: &str, password: &str) {
            self.identities
                .lock()
                .unwrap()
                .insert(email.to_string(), (id.to_string(), password.to_string()));
        }

        pub fn has_identity(&self, id: &str) -> bool {
            self.identities.lock().unwrap().values().any(|(i, _)| i == id)
        }

        pub fn has_identity_email(&self, email: &str) -> bool {
            self.identities.lock().unwrap().contains_key(email)
        }

        pub fn identity_count(&self) -> usize {
            self.identities.lock().unwrap().len()
        }

        pub fn seed_row(&self, table: &str, row: Value) {
            self.tables
                .lock()
                .unwrap()
                .entry(table.to_string())
                .or_default()
                .push(row);
        }

        pub fn rows(&self, table: &str) -> Vec<Value> {
            self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
        }

        /// Inserts, updates and deletes seen on any table.
        pub fn table_writes(&self) -> usize {
            self.table_writes.load(Ordering::SeqCst)
        }

        fn gate(&self) -> Result<(), StoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::RemoteUnavailable("fake outage".into()));
            }
            Ok(())
        }
    }

    fn row_id(row: &Value) -> Option<&str> {
        row.get("id").and_then(Value::as_str)
    }

    #[async_trait]
    impl RemoteBackend for FakeRemote {
        async fn sign_in(&self, email: &str, password: &str) -> Result<RemoteSession, StoreError> {
            self.gate()?;
            let identities = self.identities.lock().unwrap();
            match identities.get(email) {
                Some((id, stored)) if stored == password => Ok(RemoteSession {
                    identity_id: id.clone(),
                    access_token: format!("token-{id}"),
                    expires_in: 3600,
                }),
                _ => Err(StoreError::Authentication),
            }
        }

        async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, StoreError> {
            self.gate()?;
            let id = uuid::Uuid::new_v4().to_string();
            self.add_identity(&id, email, password);
            let session = self
                .sign_up_returns_session
                .load(Ordering::SeqCst)
                .then(|| RemoteSession {
                    identity_id: id.clone(),
                    access_token: format!("token-{id}"),
                    expires_in: 3600,
                });
            Ok(SignUp {
                identity_id: id,
                session,
            })
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), StoreError> {
            self.gate()
        }

        fn can_delete_identities(&self) -> bool {
            !self.identity_delete_refused.load(Ordering::SeqCst)
        }

        async fn delete_identity(&self, identity_id: &str) -> Result<(), StoreError> {
            self.gate()?;
            if !self.can_delete_identities() {
                return Err(StoreError::Rejected("service key not configured".into()));
            }
            if self.fail_identity_delete.load(Ordering::SeqCst)
                || take_failure(&self.fail_identity_delete_times)
            {
                return Err(StoreError::RemoteUnavailable("identity delete failed".into()));
            }
            self.identities
                .lock()
                .unwrap()
                .retain(|_, (id, _)| id != identity_id);
            Ok(())
        }

        async fn set_access_token(&self, token: Option<String>) {
            *self.token.lock().unwrap() = token;
        }

        async fn select(&self, table: &str) -> Result<Vec<Value>, StoreError> {
            self.gate()?;
            Ok(self.rows(table))
        }

        async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
            self.gate()?;
            Ok(self.rows(table).into_iter().find(|r| row_id(r) == Some(id)))
        }

        async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
            self.gate()?;
            self.table_writes.fetch_add(1, Ordering::SeqCst);
            if take_failure(&self.fail_inserts) {
                return Err(StoreError::RemoteUnavailable("insert failed".into()));
            }
            self.seed_row(table, row.clone());
            Ok(row)
        }

        async fn update(&self, table: &str, id: &str, row: Value) -> Result<Option<Value>, StoreError> {
            self.gate()?;
            self.table_writes.fetch_add(1, Ordering::SeqCst);
            let mut tables = self.tables.lock().unwrap();
            let Some(existing) = tables
                .get_mut(table)
                .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            else {
                return Ok(None);
            };
            *existing = row.clone();
            Ok(Some(row))
        }

        async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
            self.gate()?;
            self.table_writes.fetch_add(1, Ordering::SeqCst);
            if take_failure(&self.fail_deletes) {
                return Err(StoreError::RemoteUnavailable("delete failed".into()));
            }
            if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
                rows.retain(|r| row_id(r) != Some(id));
            }
            Ok(())
        }
    }
}

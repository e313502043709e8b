use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::CurrentUser,
    entities::repo_types::{
        Client, ClientDraft, ClientPatch, Salesperson, SalespersonDraft, SalespersonPatch,
    },
    error::ApiError,
    state::AppState,
    views::{filter::ClientFilterQuery, ClientFilter, DashboardView},
};

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/:id", axum::routing::put(update_client).delete(delete_client))
}

pub fn salesman_routes() -> Router<AppState> {
    Router::new()
        .route("/salesmen", get(list_salesmen).post(create_salesman))
        .route(
            "/salesmen/:id",
            axum::routing::put(update_salesman).delete(delete_salesman),
        )
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

fn not_found(kind: &str, id: &str) -> ApiError {
    warn!(%id, "{kind} not found");
    (StatusCode::NOT_FOUND, format!("{kind} not found"))
}

// --- clients ---

#[instrument(skip(state, _user))]
pub async fn list_clients(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ClientFilterQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = state.clients.list().await?;
    Ok(Json(ClientFilter::from(q).apply(&clients)))
}

#[instrument(skip(state, _user, payload))]
pub async fn create_client(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<ClientDraft>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.clients.create(payload).await?;
    info!(client_id = %client.id, "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

#[instrument(skip(state, _user, payload))]
pub async fn update_client(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ClientPatch>,
) -> Result<Json<Client>, ApiError> {
    match state.clients.update(&id, payload).await? {
        Some(client) => Ok(Json(client)),
        None => Err(not_found("client", &id)),
    }
}

#[instrument(skip(state, _user))]
pub async fn delete_client(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.clients.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- sales team ---

#[instrument(skip(state, _user))]
pub async fn list_salesmen(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Salesperson>>, ApiError> {
    Ok(Json(state.salesmen.list().await?))
}

#[instrument(skip(state, _user, payload))]
pub async fn create_salesman(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<SalespersonDraft>,
) -> Result<(StatusCode, Json<Salesperson>), ApiError> {
    let salesman = state.salesmen.create(payload).await?;
    info!(salesman_id = %salesman.id, "salesperson created");
    Ok((StatusCode::CREATED, Json(salesman)))
}

#[instrument(skip(state, _user, payload))]
pub async fn update_salesman(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<SalespersonPatch>,
) -> Result<Json<Salesperson>, ApiError> {
    match state.salesmen.update(&id, payload).await? {
        Some(salesman) => Ok(Json(salesman)),
        None => Err(not_found("salesperson", &id)),
    }
}

/// Clients keep their now-dangling `salesmanId`.
#[instrument(skip(state, _user))]
pub async fn delete_salesman(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.salesmen.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<DashboardView>, ApiError> {
    let view = DashboardView::load(state.clients.as_ref(), state.salesmen.as_ref()).await?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, Router};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::state::AppState;

    async fn logged_in() -> AppState {
        let state = AppState::fake().await;
        state.session.login("staff", "password").await.unwrap();
        state
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (u16, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status().as_u16();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn clients_require_session() {
        let state = AppState::fake().await;
        let (status, _) = send(build_app(state), request("GET", "/api/v1/clients", None)).await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn client_list_applies_filter_query() {
        let state = logged_in().await;
        let (status, all) = send(build_app(state.clone()), request("GET", "/api/v1/clients", None)).await;
        assert_eq!(status, 200);
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, only_s1) = send(
            build_app(state.clone()),
            request("GET", "/api/v1/clients?salesman=s1", None),
        )
        .await;
        for c in only_s1.as_array().unwrap() {
            assert_eq!(c["salesmanId"], "s1");
        }

        let (_, none) = send(
            build_app(state),
            request("GET", "/api/v1/clients?search=zzzz-no-match", None),
        )
        .await;
        assert!(none.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn client_crud_round() {
        let state = logged_in().await;
        let (status, created) = send(
            build_app(state.clone()),
            request(
                "POST",
                "/api/v1/clients",
                Some(json!({
                    "fullName": "Dana Event Co",
                    "phone": "555-0300",
                    "email": "dana@example.com",
                    "socialMedia": {"instagram": "https://instagram.com/dana"}
                })),
            ),
        )
        .await;
        assert_eq!(status, 201);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, updated) = send(
            build_app(state.clone()),
            request(
                "PUT",
                &format!("/api/v1/clients/{id}"),
                Some(json!({"socialMedia": {"facebook": "https://facebook.com/dana"}})),
            ),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(updated["socialMedia"]["instagram"], "https://instagram.com/dana");
        assert_eq!(updated["socialMedia"]["facebook"], "https://facebook.com/dana");
        assert_eq!(updated["fullName"], "Dana Event Co");

        let (status, _) = send(
            build_app(state.clone()),
            request("DELETE", &format!("/api/v1/clients/{id}"), None),
        )
        .await;
        assert_eq!(status, 204);

        let (status, _) = send(
            build_app(state),
            request("PUT", &format!("/api/v1/clients/{id}"), Some(json!({"notes": "x"}))),
        )
        .await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn salesman_update_and_dashboard() {
        let state = logged_in().await;
        let (status, updated) = send(
            build_app(state.clone()),
            request("PUT", "/api/v1/salesmen/s1", Some(json!({"phone": "555-9999"}))),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(updated["phone"], "555-9999");
        assert_eq!(updated["id"], "s1");

        let (status, stats) = send(build_app(state), request("GET", "/api/v1/dashboard", None)).await;
        assert_eq!(status, 200);
        assert_eq!(stats["clientCount"], 2);
        assert_eq!(stats["salespersonCount"], 3);
        assert_eq!(stats["recentClients"].as_array().unwrap().len(), 2);
    }
}

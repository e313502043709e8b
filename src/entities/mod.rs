use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod local;
pub mod remote;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::client_routes())
        .merge(handlers::salesman_routes())
        .merge(handlers::dashboard_routes())
}

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, entities};

/// The session lives in `state` and is shared by every caller: once someone
/// logs in, any client that can reach the listener acts as that user.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(entities::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Loopback unless a host is given.
fn listen_addr(host: Option<String>, port: Option<String>) -> anyhow::Result<SocketAddr> {
    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| "127.0.0.1".into()),
        port.unwrap_or_else(|| "8080".into())
    )
    .parse()?;
    Ok(addr)
}

/// Binds `APP_HOST:APP_PORT`.
pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr = listen_addr(std::env::var("APP_HOST").ok(), std::env::var("APP_PORT").ok())?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

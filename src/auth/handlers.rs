use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{CreatedUserResponse, LoginRequest},
        extractors::{AdminUser, CurrentUser},
        repo_types::{NewUser, User},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", delete(delete_user))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .session
        .login(&payload.username, &payload.password)
        .await
        .map_err(|e| {
            warn!(error = %e, "login failed");
            ApiError::from(e)
        })?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.session.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.session.list_users().await?))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.0.id, username = %payload.username))]
pub async fn create_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<NewUser>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), ApiError> {
    let user = state.session.create_user(payload).await?;

    let session_replaced = if state.session.create_user_preserves_session() {
        false
    } else {
        state.session.current_user().await?.map(|u| u.id) != Some(admin.0.id.clone())
    };
    if session_replaced {
        warn!(user_id = %user.id, "active session switched by user creation");
    }

    info!(user_id = %user.id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            user,
            session_replaced,
        }),
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.session.delete_user(&id).await?;
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::state::AppState;

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(state: &AppState, username: &str) {
        let app = build_app(state.clone());
        let resp = app
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"username": username, "password": "password"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn me_requires_session() {
        let state = AppState::fake().await;
        let resp = build_app(state).oneshot(get("/api/v1/me")).await.unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn login_then_me_then_logout() {
        let state = AppState::fake().await;
        login(&state, "admin").await;

        let resp = build_app(state.clone()).oneshot(get("/api/v1/me")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let me = body_json(resp).await;
        assert_eq!(me["username"], "admin");
        assert_eq!(me["role"], "admin");

        let resp = build_app(state.clone())
            .oneshot(post_json("/api/v1/auth/logout", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);

        let resp = build_app(state).oneshot(get("/api/v1/me")).await.unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn bad_credentials_are_401() {
        let state = AppState::fake().await;
        let resp = build_app(state)
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"username": "admin", "password": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn staff_cannot_create_users() {
        let state = AppState::fake().await;
        login(&state, "staff").await;
        let resp = build_app(state)
            .oneshot(post_json(
                "/api/v1/users",
                json!({"name": "X", "username": "x", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);
    }

    #[tokio::test]
    async fn admin_creates_user_and_duplicate_conflicts() {
        let state = AppState::fake().await;
        login(&state, "admin").await;

        let body = json!({"name": "Nina", "username": "nina", "password": "pw"});
        let resp = build_app(state.clone())
            .oneshot(post_json("/api/v1/users", body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let created = body_json(resp).await;
        assert_eq!(created["user"]["role"], "staff");
        assert_eq!(created["sessionReplaced"], false);

        let resp = build_app(state)
            .oneshot(post_json("/api/v1/users", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);
    }

    #[tokio::test]
    async fn last_admin_delete_is_409() {
        let state = AppState::fake().await;
        login(&state, "admin").await;
        let resp = build_app(state)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/users/u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);
    }
}

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::StatusCode};
use tracing::warn;

use crate::auth::repo_types::User;
use crate::error::StoreError;
use crate::state::AppState;

/// User of the runtime's active session; rejects with 401 when there is none.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match state.session.current_user().await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(StoreError::Unauthorized.into()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Active session with the admin role; 403 for staff.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = %user.id, "admin route refused");
            return Err((StatusCode::FORBIDDEN, "Administrator role required".into()));
        }
        Ok(AdminUser(user))
    }
}

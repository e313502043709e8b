use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for `POST /users`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUserResponse {
    pub user: User,
    /// The runtime's session now belongs to someone else, usually the new user.
    pub session_replaced: bool,
}

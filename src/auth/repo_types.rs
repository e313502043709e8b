use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Application role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

/// Public user fields. Also the shape of a remote profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,       // identity id
    pub username: String, // unique, case-sensitive
    pub name: String,     // display name
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Users collection record in the local storage area.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String, // Argon2 hash
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Staff
}

/// The single active session of this runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Session {
    pub fn start(user: User, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            user,
            started_at: now,
            expires_at: now + ttl,
            access_token: None,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Users present in a fresh local storage area. Both passwords are `password`.
pub(crate) fn seed_users() -> Vec<(User, &'static str)> {
    vec![
        (
            User {
                id: "u1".into(),
                username: "admin".into(),
                name: "Admin User".into(),
                role: Role::Admin,
            },
            "password",
        ),
        (
            User {
                id: "u2".into(),
                username: "staff".into(),
                name: "Sales Staff".into(),
                role: Role::Staff,
            },
            "password",
        ),
    ]
}

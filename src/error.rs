use axum::http::StatusCode;
use thiserror::Error;

/// Which half of a paired identity/profile write is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteHalf {
    Identity,
    Profile,
}

impl std::fmt::Display for WriteHalf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteHalf::Identity => f.write_str("identity"),
            WriteHalf::Profile => f.write_str("profile"),
        }
    }
}

/// Errors surfaced by the session and entity stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid credentials")]
    Authentication,

    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("cannot delete the last administrator")]
    LastAdministrator,

    #[error("record not found")]
    NotFound,

    #[error("no active session")]
    Unauthorized,

    #[error("remote backend unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("remote backend did not answer in time")]
    Timeout,

    #[error("remote backend rejected the request: {0}")]
    Rejected(String),

    /// One half of an identity/profile pair committed and could not be undone.
    #[error("partial write: {completed} record committed, {failed} record failed: {detail}")]
    PartialWrite {
        completed: WriteHalf,
        failed: WriteHalf,
        detail: String,
    },

    #[error("local storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::RemoteUnavailable(_) | StoreError::Timeout)
    }

    /// Errors a form shows inline while staying open.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateUsername(_) | StoreError::LastAdministrator
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::Authentication | StoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            StoreError::DuplicateUsername(_) | StoreError::LastAdministrator => {
                StatusCode::CONFLICT
            }
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::RemoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            StoreError::PartialWrite { .. } | StoreError::Rejected(_) => StatusCode::BAD_GATEWAY,
            StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(format!("codec: {e}"))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(format!("io: {e}"))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else if e.is_decode() {
            StoreError::RemoteUnavailable(format!("malformed response: {e}"))
        } else {
            StoreError::RemoteUnavailable(e.to_string())
        }
    }
}

/// Rejection shape used by every handler.
pub type ApiError = (StatusCode, String);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        (e.status(), e.to_string())
    }
}

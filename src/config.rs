use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Remote,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => bail!("unknown backend {other:?}, expected \"local\" or \"remote\""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
    /// Privileged key for identity deletion; without it remote user deletion is refused.
    pub service_key: Option<String>,
    pub identity_domain: String,
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub data_dir: PathBuf,
    pub storage_namespace: String,
    pub session_ttl_minutes: i64,
    pub remote: Option<RemoteConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = std::env::var("LEVANT_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .parse::<BackendKind>()?;

        let remote = match backend {
            BackendKind::Local => None,
            BackendKind::Remote => Some(RemoteConfig {
                url: std::env::var("REMOTE_URL").context("REMOTE_URL is required for the remote backend")?,
                anon_key: std::env::var("REMOTE_ANON_KEY")
                    .context("REMOTE_ANON_KEY is required for the remote backend")?,
                service_key: std::env::var("REMOTE_SERVICE_KEY").ok(),
                identity_domain: std::env::var("REMOTE_IDENTITY_DOMAIN")
                    .unwrap_or_else(|_| "levantevents.com".into()),
                timeout_secs: std::env::var("REMOTE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(10),
            }),
        };

        Ok(Self {
            backend,
            data_dir: std::env::var("LEVANT_DATA_DIR")
                .unwrap_or_else(|_| "./data".into())
                .into(),
            storage_namespace: std::env::var("LEVANT_STORAGE_NAMESPACE")
                .unwrap_or_else(|_| "levant".into()),
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(12 * 60),
            remote,
        })
    }

    pub fn session_ttl(&self) -> time::Duration {
        time::Duration::minutes(self.session_ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parses_case_insensitively() {
        assert_eq!("Local".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!(" remote ".parse::<BackendKind>().unwrap(), BackendKind::Remote);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }
}

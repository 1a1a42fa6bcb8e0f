use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BASE_URL: &str = "SIMBA_API_BASE_URL";
pub const ENV_AUTH_TOKEN: &str = "SIMBA_AUTH_TOKEN";
pub const ENV_ORG: &str = "SIMBA_ORG";
/// Overrides the location of `platform.json`.
pub const ENV_CONFIG_PATH: &str = "SIMBA_ETH_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_deployment_timeout_secs")]
    pub deployment_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_deployment_timeout_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: None,
            org: None,
            app: None,
            poll_interval_ms: default_poll_interval_ms(),
            deployment_timeout_secs: default_deployment_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PlatformConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    #[must_use]
    pub fn with_org(mut self, org: &str) -> Self {
        self.org = Some(org.to_owned());
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_deployment_timeout(mut self, timeout: Duration) -> Self {
        self.deployment_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deployment_timeout(&self) -> Duration {
        Duration::from_secs(self.deployment_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load `platform.json` if it exists, then apply env overrides.
    ///
    /// A missing file is not an error; the result may still lack a url, which
    /// `ensure_url` reports.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        let config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid platform config: {e}")))?;
        Ok(Self {
            url: config.url.trim_end_matches('/').to_owned(),
            ..config
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `SIMBA_API_BASE_URL`, `SIMBA_AUTH_TOKEN` and `SIMBA_ORG`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = set(ENV_BASE_URL) {
            self.url = url.trim_end_matches('/').to_owned();
        }
        if let Some(token) = set(ENV_AUTH_TOKEN) {
            self.auth_token = Some(token);
        }
        if let Some(org) = set(ENV_ORG) {
            self.org = Some(org);
        }
        self
    }

    pub fn ensure_url(&self) -> Result<(), RemoteError> {
        if self.url.is_empty() {
            return Err(RemoteError::Config(format!(
                "no platform url configured; run `simba-eth config set --url <url>` or set {ENV_BASE_URL}"
            )));
        }
        Ok(())
    }
}

/// `$SIMBA_ETH_CONFIG`, else `~/.config/simba-eth/platform.json`.
pub fn default_config_path() -> Result<PathBuf, RemoteError> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/simba-eth/platform.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/platform.json");

        let config = PlatformConfig::new("https://api.example.com/")
            .with_token("secret123")
            .with_org("acme");
        config.save(&path).unwrap();

        let loaded = PlatformConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.url, "https://api.example.com");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.json");
        std::fs::write(&path, r#"{"url": "http://localhost:8787/"}"#).unwrap();

        let loaded = PlatformConfig::load(&path).unwrap();
        assert_eq!(loaded.url, "http://localhost:8787");
        assert_eq!(loaded.poll_interval(), Duration::from_secs(2));
        assert_eq!(loaded.deployment_timeout(), Duration::from_secs(300));
        assert_eq!(loaded.request_timeout_secs, 30);
        assert!(loaded.auth_token.is_none());
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            PlatformConfig::load(&path),
            Err(RemoteError::Config(_))
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://override:1/"),
            (ENV_AUTH_TOKEN, "tok"),
            (ENV_ORG, ""),
        ]
        .into_iter()
        .collect();
        let config = PlatformConfig::new("http://file")
            .with_org("from-file")
            .with_overrides(|k| env.get(k).map(|v| (*v).to_owned()));

        assert_eq!(config.url, "http://override:1");
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.org.as_deref(), Some("from-file"));
    }

    #[test]
    fn empty_url_is_reported() {
        assert!(PlatformConfig::default().ensure_url().is_err());
        assert!(PlatformConfig::new("http://x").ensure_url().is_ok());
    }
}

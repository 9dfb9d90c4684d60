//! Service configuration
//!
//! Settings are read from a TOML file (an explicit path, else
//! `<config dir>/sdkforge/config.toml` when present, else defaults) and then
//! overridden from the environment.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::infrastructure::publish::github::{DEFAULT_API_URL, GitHubToken};

pub const ENV_BIND: &str = "SDKFORGE_BIND";
pub const ENV_PUBLISHER: &str = "SDKFORGE_PUBLISHER";
pub const ENV_OUTPUT_DIR: &str = "SDKFORGE_OUTPUT_DIR";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_ACCESS_TOKEN";
pub const ENV_GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid setting {key}: {message}")]
    Invalid { key: String, message: String },
}

impl SettingsError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub orchestrator: OrchestratorSettings,
    pub publisher: PublisherSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    /// Whole-request deadline; in-flight setups are cancelled when it passes
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            request_timeout_secs: 300,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorSettings {
    /// Upper bound on concurrently running per-language tasks
    pub max_fan_out: usize,
    pub retry: RetrySettings,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_fan_out: 4,
            retry: RetrySettings::default(),
        }
    }
}

/// Backoff for transient publish failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    GitHub,
    #[default]
    Filesystem,
    Memory,
}

impl std::str::FromStr for PublisherKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(PublisherKind::GitHub),
            "filesystem" => Ok(PublisherKind::Filesystem),
            "memory" => Ok(PublisherKind::Memory),
            other => Err(SettingsError::invalid(
                "publisher.kind",
                format!("unknown publisher '{other}', expected github, filesystem or memory"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherSettings {
    pub kind: PublisherKind,
    pub github: GitHubSettings,
    pub filesystem: FilesystemSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSettings {
    pub api_url: String,
    pub owner: Option<String>,
    pub token: Option<GitHubToken>,
    pub private: bool,
    pub timeout_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: None,
            token: None,
            private: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesystemSettings {
    pub root: PathBuf,
}

impl Default for FilesystemSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("published"),
        }
    }
}

/// `<config dir>/sdkforge/config.toml`, honoring `XDG_CONFIG_HOME`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sdkforge").join("config.toml"))
}

impl AppConfig {
    /// Load from `path` (or the default location) with process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an injectable environment lookup
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.is_file() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind
                .trim()
                .parse()
                .map_err(|e| SettingsError::invalid(ENV_BIND, format!("{bind}: {e}")))?;
        }
        if let Some(kind) = lookup(ENV_PUBLISHER) {
            self.publisher.kind = kind.parse()?;
        }
        if let Some(root) = lookup(ENV_OUTPUT_DIR) {
            self.publisher.filesystem.root = PathBuf::from(root);
        }
        if let Some(token) = lookup(ENV_GITHUB_TOKEN) {
            self.publisher.github.token = Some(GitHubToken::new(token.trim()));
        }
        if let Some(owner) = lookup(ENV_GITHUB_OWNER) {
            self.publisher.github.owner = Some(owner.trim().to_string());
        }
        if let Some(api_url) = lookup(ENV_GITHUB_API_URL) {
            self.publisher.github.api_url = api_url.trim().to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.orchestrator.max_fan_out == 0 {
            return Err(SettingsError::invalid(
                "orchestrator.max_fan_out",
                "must be at least 1",
            ));
        }
        let retry = &self.orchestrator.retry;
        if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
            return Err(SettingsError::invalid(
                "orchestrator.retry.multiplier",
                "must be at least 1.0",
            ));
        }
        if retry.max_backoff_ms < retry.initial_backoff_ms {
            return Err(SettingsError::invalid(
                "orchestrator.retry.max_backoff_ms",
                "must not be smaller than initial_backoff_ms",
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(SettingsError::invalid(
                "server.request_timeout_secs",
                "must be at least 1",
            ));
        }

        if self.publisher.kind == PublisherKind::GitHub {
            let github = &self.publisher.github;
            Url::parse(&github.api_url)
                .map_err(|e| SettingsError::invalid("publisher.github.api_url", e.to_string()))?;
            if github.token.as_ref().is_none_or(GitHubToken::is_empty) {
                return Err(SettingsError::invalid(
                    "publisher.github.token",
                    format!("required for the github publisher (or set {ENV_GITHUB_TOKEN})"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(config.orchestrator.max_fan_out, 4);
        assert_eq!(config.orchestrator.retry.max_retries, 3);
        assert_eq!(config.publisher.kind, PublisherKind::Filesystem);
        assert!(config.publisher.github.private);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let file = write_config(
            r#"
[server]
bind = "0.0.0.0:9000"

[orchestrator]
max_fan_out = 2

[orchestrator.retry]
max_retries = 5

[publisher]
kind = "github"

[publisher.github]
owner = "acme-org"
token = "ghp_from_file"
private = false
"#,
        );

        let config = AppConfig::load_with(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.orchestrator.max_fan_out, 2);
        assert_eq!(config.orchestrator.retry.max_retries, 5);
        assert_eq!(config.orchestrator.retry.initial_backoff_ms, 500);
        assert_eq!(config.publisher.kind, PublisherKind::GitHub);
        assert_eq!(config.publisher.github.owner.as_deref(), Some("acme-org"));
        assert_eq!(
            config.publisher.github.token.as_ref().map(GitHubToken::expose),
            Some("ghp_from_file")
        );
        assert!(!config.publisher.github.private);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config("[publisher]\nkind = \"memory\"\n");
        let config = AppConfig::load_with(
            Some(file.path()),
            env(&[
                (ENV_PUBLISHER, "github"),
                (ENV_GITHUB_TOKEN, "ghp_env"),
                (ENV_GITHUB_OWNER, "acme"),
                (ENV_BIND, "127.0.0.1:8123"),
                (ENV_OUTPUT_DIR, "/tmp/repos"),
            ]),
        )
        .unwrap();

        assert_eq!(config.publisher.kind, PublisherKind::GitHub);
        assert_eq!(config.publisher.github.owner.as_deref(), Some("acme"));
        assert_eq!(config.server.bind.port(), 8123);
        assert_eq!(config.publisher.filesystem.root, PathBuf::from("/tmp/repos"));
    }

    #[test]
    fn test_github_publisher_requires_token() {
        let file = write_config("[publisher]\nkind = \"github\"\n");
        let error = AppConfig::load_with(Some(file.path()), env(&[])).unwrap_err();
        assert!(error.to_string().contains("publisher.github.token"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config("[orchestrator]\nmax_fan_out = 0\n");
        assert!(AppConfig::load_with(Some(file.path()), env(&[])).is_err());

        let error = AppConfig::load_with(
            Some(write_config("").path()),
            env(&[(ENV_PUBLISHER, "ftp")]),
        )
        .unwrap_err();
        assert!(error.to_string().contains("unknown publisher 'ftp'"));
    }

    #[test]
    fn test_unknown_keys_are_parse_errors() {
        let file = write_config("[server]\nport = 80\n");
        let error = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(error, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let error = AppConfig::from_file(Path::new("/nonexistent/sdkforge.toml")).unwrap_err();
        assert!(matches!(error, SettingsError::Read { .. }));
    }
}

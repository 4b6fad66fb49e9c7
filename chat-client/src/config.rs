//! Configuration loading for the chat client.
//!
//! Configuration is loaded from a TOML file (default: `chatsync.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Backend access.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Session persistence.
    #[serde(default)]
    pub session: SessionConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Startup behavior.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Backend access configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// API root (default: http://localhost:8001/api).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session state file (default: session.json).
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: info).
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Startup behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Reopen the last conversation on start (default: true).
    #[serde(default = "default_restore_last_peer")]
    pub restore_last_peer: bool,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8001/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_state_path() -> PathBuf {
    PathBuf::from("session.json")
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_restore_last_peer() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            restore_last_peer: default_restore_last_peer(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), String> {
        if self.gateway.request_timeout_secs == 0 {
            return Err("gateway.request_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but is out of range.
    #[error("invalid config file {path}: {reason}")]
    Invalid {
        /// Path to the configuration file.
        path: PathBuf,
        /// What is wrong.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.gateway.base_url, "http://localhost:8001/api");
        assert_eq!(config.gateway.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.session.state_path, PathBuf::from("session.json"));
        assert_eq!(config.logging.filter, "info");
        assert!(config.sync.restore_last_peer);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[gateway]
base_url = "https://chat.example.com/api"
request_timeout_secs = 5

[session]
state_path = "/var/lib/chatsync/session.json"

[logging]
filter = "chatsync_client=debug"

[sync]
restore_last_peer = false
"#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.gateway.base_url, "https://chat.example.com/api");
        assert_eq!(config.gateway.request_timeout_secs, 5);
        assert_eq!(
            config.session.state_path,
            PathBuf::from("/var/lib/chatsync/session.json")
        );
        assert_eq!(config.logging.filter, "chatsync_client=debug");
        assert!(!config.sync.restore_last_peer);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.request_timeout_secs, 30);
        assert!(config.sync.restore_last_peer);
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let toml = r#"
[gateway]
request_timeout_secs = 10
[session]
"#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.gateway.base_url, "http://localhost:8001/api");
        assert_eq!(config.gateway.request_timeout_secs, 10);
        assert_eq!(config.session.state_path, PathBuf::from("session.json"));
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = ClientConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("absent.toml"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[gateway\n").unwrap();
        assert!(matches!(
            ClientConfig::from_file(&bad),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatsync.toml");
        std::fs::write(&path, "[gateway]\nrequest_timeout_secs = 0\n").unwrap();

        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("request_timeout_secs"));
    }
}

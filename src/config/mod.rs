//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the `techread` binary)
//!
//! The configuration is handed to [`crate::TechreadClient`] explicitly and is
//! read-only afterwards; there is no process-wide default state.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TechreadError};

/// Default control channel host
pub const DEFAULT_SERVER_WSS: &str = "ws-api.w24.co";

/// Default support (HTTPS) host
pub const DEFAULT_SERVER_HTTPS: &str = "support.w24.co";

/// Default API version
pub const DEFAULT_VERSION: &str = "v2";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service endpoints and timeouts
    #[serde(default)]
    pub server: ServerConfig,

    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;

        toml::from_str(&content)
            .map_err(|e| TechreadError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(token) = std::env::var("W24TECHREAD_AUTH_TOKEN") {
            config.auth.token = Some(token);
        }
        if let Ok(key) = std::env::var("W24TECHREAD_DEVELOPMENT_KEY") {
            config.auth.development_key = Some(key);
        }
        if let Ok(wss) = std::env::var("W24TECHREAD_SERVER_WSS") {
            config.server.wss = wss;
        }
        if let Ok(https) = std::env::var("W24TECHREAD_SERVER_HTTPS") {
            config.server.https = https;
        }
        if let Ok(version) = std::env::var("W24TECHREAD_VERSION") {
            config.server.version = version;
        }

        config
    }

    /// Default config file location (`<config_dir>/techread/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("techread").join("config.toml"))
    }

    /// Load the default config file (if present) overlaid by the environment
    pub fn load() -> Result<Self> {
        let file = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        Ok(file.merge(Self::from_env()))
    }

    /// Merge with another config (other takes precedence where it differs
    /// from the defaults)
    pub fn merge(self, other: Self) -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerConfig {
                wss: if other.server.wss != defaults.wss {
                    other.server.wss
                } else {
                    self.server.wss
                },
                https: if other.server.https != defaults.https {
                    other.server.https
                } else {
                    self.server.https
                },
                version: if other.server.version != defaults.version {
                    other.server.version
                } else {
                    self.server.version
                },
                connect_timeout_secs: if other.server.connect_timeout_secs
                    != defaults.connect_timeout_secs
                {
                    other.server.connect_timeout_secs
                } else {
                    self.server.connect_timeout_secs
                },
                request_timeout_secs: if other.server.request_timeout_secs
                    != defaults.request_timeout_secs
                {
                    other.server.request_timeout_secs
                } else {
                    self.server.request_timeout_secs
                },
            },
            auth: AuthConfig {
                token: other.auth.token.or(self.auth.token),
                development_key: other.auth.development_key.or(self.auth.development_key),
            },
        }
    }

    /// Copy of this config with the token masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.auth.token.is_some() {
            config.auth.token = Some("********".to_string());
        }
        config
    }
}

/// Service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Control channel host, optionally with a `ws://`/`wss://` scheme
    pub wss: String,

    /// Support host for uploads-with-callback, optionally with a scheme
    pub https: String,

    /// API version path segment
    pub version: String,

    /// Control channel handshake timeout in seconds
    pub connect_timeout_secs: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            wss: DEFAULT_SERVER_WSS.to_string(),
            https: DEFAULT_SERVER_HTTPS.to_string(),
            version: DEFAULT_VERSION.to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Full control channel endpoint, e.g. `wss://ws-api.w24.co/v2`
    pub fn wss_endpoint(&self) -> String {
        let host = self.wss.trim_end_matches('/');
        if host.starts_with("ws://") || host.starts_with("wss://") {
            format!("{host}/{}", self.version)
        } else {
            format!("wss://{host}/{}", self.version)
        }
    }

    /// Base URL of the support service, always ending in `/`
    pub fn https_base(&self) -> String {
        let host = self.https.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}/")
        } else {
            format!("https://{host}/")
        }
    }

    /// Handshake timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Credential configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// API token
    pub token: Option<String>,

    /// Key routing requests to an internal architecture
    pub development_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.wss, "ws-api.w24.co");
        assert_eq!(config.server.version, "v2");
        assert!(config.auth.token.is_none());
    }

    #[test]
    fn test_endpoints() {
        let server = ServerConfig::default();
        assert_eq!(server.wss_endpoint(), "wss://ws-api.w24.co/v2");
        assert_eq!(server.https_base(), "https://support.w24.co/");

        let local = ServerConfig {
            wss: "ws://127.0.0.1:9000/".to_string(),
            https: "http://127.0.0.1:9001".to_string(),
            ..Default::default()
        };
        assert_eq!(local.wss_endpoint(), "ws://127.0.0.1:9000/v2");
        assert_eq!(local.https_base(), "http://127.0.0.1:9001/");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [server]
            wss = "ws.example.com"
            version = "v3"

            [auth]
            token = "secret"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.wss, "ws.example.com");
        assert_eq!(config.server.version, "v3");
        assert_eq!(config.server.https, DEFAULT_SERVER_HTTPS);
        assert_eq!(config.auth.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nrequest_timeout_secs = 5\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.request_timeout_secs, 5);

        let missing = Config::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(TechreadError::Io(_))));
        assert_eq!(missing.unwrap_err().kind(), crate::error::ErrorKind::Io);

        std::fs::write(&path, "[server\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(TechreadError::Config(_))));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = Config {
            server: ServerConfig {
                wss: "file.example.com".to_string(),
                ..Default::default()
            },
            auth: AuthConfig {
                token: Some("file-token".to_string()),
                development_key: Some("dev".to_string()),
            },
        };
        let overrides = Config {
            auth: AuthConfig {
                token: Some("env-token".to_string()),
                development_key: None,
            },
            ..Default::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.server.wss, "file.example.com");
        assert_eq!(merged.auth.token.as_deref(), Some("env-token"));
        assert_eq!(merged.auth.development_key.as_deref(), Some("dev"));
    }

    #[test]
    fn test_redacted_hides_token() {
        let mut config = Config::default();
        config.auth.token = Some("secret".to_string());
        assert_eq!(config.redacted().auth.token.as_deref(), Some("********"));
    }
}

//! Client configuration
//!
//! Layered loading: built-in defaults, then an optional TOML file, then
//! `APRANOVA__SECTION__KEY` environment variables, then `APRANOVA_API_URL`.

use crate::error::{CoreError, CoreResult, ErrorContext};
use crate::logging::LoggingConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable holding the backend base URL
pub const API_URL_ENV: &str = "APRANOVA_API_URL";

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend origin, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Path prefix every endpoint lives under
    pub path_prefix: String,
    /// Global request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            path_prefix: "/api".to_string(),
            timeout_seconds: 30,
            user_agent: format!("apranova-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    /// Full URL for an endpoint path such as `/users/login/`
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.path_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');

        if prefix.is_empty() {
            format!("{}/{}", base, path)
        } else {
            format!("{}/{}/{}", base, prefix, path)
        }
    }
}

/// Session persistence settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Session file path; defaults to the platform data directory
    pub session_file: Option<String>,
    /// Key the access token is stored under
    pub access_token_key: String,
    /// Key the refresh token is stored under
    pub refresh_token_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_file: None,
            access_token_key: "access_token".to_string(),
            refresh_token_key: "refresh_token".to_string(),
        }
    }
}

impl StorageConfig {
    /// Resolve the session file location
    pub fn session_path(&self) -> PathBuf {
        match &self.session_file {
            Some(path) => expand_home(path),
            None => dirs::data_dir()
                .or_else(|| dirs::home_dir().map(|d| d.join(".local").join("share")))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("apranova")
                .join("session.json"),
        }
    }
}

/// Top-level client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = toml::to_string(&ClientConfig::default()).map_err(|e| CoreError::Config {
            message: format!("Failed to serialize default config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("defaults"),
        })?;

        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml));

        match path {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(found) = Self::default_paths().into_iter().find(|p| p.exists()) {
                    info!("Loading configuration from {:?}", found);
                    builder = builder.add_source(File::from(found).required(false));
                } else {
                    debug!("No configuration file found, using defaults");
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("APRANOVA")
                .prefix_separator("__")
                .separator("__"),
        );

        if let Ok(api_url) = std::env::var(API_URL_ENV) {
            builder = builder
                .set_override("api.base_url", api_url)
                .map_err(|e| CoreError::Config {
                    message: format!("Invalid {}: {}", API_URL_ENV, e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("config").with_operation("env_override"),
                })?;
        }

        let config: ClientConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CoreError::Config {
                message: format!("Failed to load config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("load")
                    .with_suggestion("Check TOML syntax and APRANOVA__* variables"),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Candidate config file locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|d| d.join("apranova").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".apranova").join("config.toml")),
            Some(PathBuf::from("apranova.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load configuration from a single TOML file, without layering
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        toml::from_str(&content).map_err(|e| CoreError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CoreError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| CoreError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| CoreError::Config {
            message: format!("Invalid api.base_url '{}': {}", self.api.base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("validate")
                .with_suggestion("Use an absolute URL such as http://localhost:8000"),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(&format!(
                "api.base_url must use http or https, got '{}'",
                base.scheme()
            )));
        }

        if self.api.timeout_seconds == 0 {
            return Err(invalid("api.timeout_seconds must be greater than 0"));
        }

        let access = self.storage.access_token_key.trim();
        let refresh = self.storage.refresh_token_key.trim();
        if access.is_empty() || refresh.is_empty() {
            return Err(invalid("storage token keys must not be empty"));
        }
        if access == refresh {
            return Err(invalid(
                "storage.access_token_key and storage.refresh_token_key must differ",
            ));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config").with_operation("validate"),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let api = ApiConfig::default();
        assert_eq!(
            api.endpoint("/users/login/"),
            "http://localhost:8000/api/users/login/"
        );

        let api = ApiConfig {
            base_url: "https://lms.example.com/".to_string(),
            path_prefix: "api/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            api.endpoint("auth/password/reset/"),
            "https://lms.example.com/api/auth/password/reset/"
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.api.base_url = "ftp://files.example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.storage.refresh_token_key = "access_token".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_session_file() {
        let storage = StorageConfig {
            session_file: Some("/tmp/apranova/session.json".to_string()),
            ..Default::default()
        };
        assert_eq!(
            storage.session_path(),
            PathBuf::from("/tmp/apranova/session.json")
        );
    }
}

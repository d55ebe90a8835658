//! Backend endpoint configuration.
//!
//! Resolution order: the `STUDYKIT_API_URL` environment variable, then
//! `~/.config/studykit/config.toml`, then the localhost default.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use studykit_core::{Result, StudykitError};

/// Default backend origin when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const API_URL_ENV: &str = "STUDYKIT_API_URL";

/// Root structure of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    backend: BackendSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BackendSection {
    #[serde(default)]
    base_url: Option<String>,
}

/// Location of the generation backend, plus URL derivation for its HTTP
/// and WebSocket endpoints.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    base_url: String,
}

impl BackendConfig {
    /// Creates a config pointing at the given origin. A trailing slash is
    /// trimmed so path joining stays predictable.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Loads configuration from the environment, the config file, or the
    /// default, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        if let Ok(url) = env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            return Ok(Self::new(url));
        }

        let config_path = config_file_path()?;
        if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|err| {
                StudykitError::config(format!(
                    "Failed to read configuration file at {}: {}",
                    config_path.display(),
                    err
                ))
            })?;
            let parsed: ConfigFile = toml::from_str(&content).map_err(|err| {
                StudykitError::Serialization {
                    format: "TOML".to_string(),
                    message: format!("{}: {}", config_path.display(), err),
                }
            })?;
            if let Some(base_url) = parsed.backend.base_url {
                return Ok(Self::new(base_url));
            }
        }

        Ok(Self::new(DEFAULT_BASE_URL))
    }

    /// The configured backend origin, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds an absolute HTTP URL for an API path.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Builds the WebSocket URL for a streaming path, mapping the http(s)
    /// scheme to ws(s).
    ///
    /// # Errors
    ///
    /// Returns a config error when the base URL carries an unrecognized
    /// scheme.
    pub fn ws_url(&self, path: &str) -> Result<String> {
        let origin = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(StudykitError::config(format!(
                "Cannot derive a WebSocket URL from base URL: {}",
                self.base_url
            )));
        };
        Ok(format!("{origin}{path}"))
    }
}

/// Returns the path to the configuration file: ~/.config/studykit/config.toml
fn config_file_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StudykitError::config("Could not determine home directory"))?;
    Ok(home.join(".config").join("studykit").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = BackendConfig::new("http://localhost:8000/");
        assert_eq!(config.base_url(), "http://localhost:8000");
        assert_eq!(
            config.api_url("/api/v1/question/generate/from-kb"),
            "http://localhost:8000/api/v1/question/generate/from-kb"
        );
    }

    #[test]
    fn test_ws_url_maps_schemes() {
        let config = BackendConfig::new("http://localhost:8000");
        assert_eq!(
            config.ws_url("/api/v1/question/mimic").unwrap(),
            "ws://localhost:8000/api/v1/question/mimic"
        );

        let config = BackendConfig::new("https://study.example.com");
        assert_eq!(
            config.ws_url("/api/v1/question/mimic").unwrap(),
            "wss://study.example.com/api/v1/question/mimic"
        );
    }

    #[test]
    fn test_ws_url_rejects_unknown_scheme() {
        let config = BackendConfig::new("ftp://localhost");
        assert!(config.ws_url("/api/v1/question/mimic").is_err());
    }
}

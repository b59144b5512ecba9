use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Identifier stamped on locally-fabricated pending messages.
    #[serde(default = "default_local_user_id")]
    pub local_user_id: String,

    /// Where the bearer token is persisted between runs.
    #[serde(default = "default_token_file")]
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            local_user_id: default_local_user_id(),
            token_file: default_token_file(),
        }
    }
}

impl ClientConfig {
    /// Loads `<config_dir>/parlor/config.toml`, falling back to defaults when
    /// the file does not exist. `PARLOR_API_URL` overrides the base URL.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(&path)?;
                toml::from_str(&raw)
                    .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?
            }
            _ => {
                debug!("no config file, using defaults");
                Self::default()
            }
        };
        if let Ok(url) = env::var("PARLOR_API_URL") {
            config.api_base_url = url;
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("parlor").join("config.toml"))
    }
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_local_user_id() -> String {
    "local".to_string()
}

fn default_token_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("parlor").join("token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: ClientConfig = toml::from_str("api_base_url = \"http://example:9000\"").unwrap();
        assert_eq!(config.api_base_url, "http://example:9000");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.local_user_id, "local");
    }
}

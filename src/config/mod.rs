//! Configuration management for forgelink
//!
//! ```yaml
//! api:
//!   endpoint: https://server.example.com/graphql
//!   token: eyJhbGciOi...
//! popup:
//!   window_title: auth with git
//!   allowed_origin: https://app.example.com
//!   orphan_timeout_secs: 600
//! ```

mod paths;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{LinkError, Result};

pub use paths::ForgelinkPaths;

/// Title given to the authorization window
pub const DEFAULT_WINDOW_TITLE: &str = "auth with git";

const DEFAULT_ENDPOINT: &str = "http://localhost:3000/graphql";

/// Root config.yaml structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgelinkConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub popup: PopupConfig,
}

/// Binding service connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
        }
    }
}

/// Popup session options. Both hardening knobs are off unless set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupConfig {
    #[serde(default = "default_window_title")]
    pub window_title: String,
    /// Only completion messages from this origin are accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origin: Option<String>,
    /// Fail a session that has not reported back after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphan_timeout_secs: Option<u64>,
}

fn default_window_title() -> String {
    DEFAULT_WINDOW_TITLE.to_string()
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            allowed_origin: None,
            orphan_timeout_secs: None,
        }
    }
}

impl PopupConfig {
    pub fn orphan_timeout(&self) -> Option<Duration> {
        self.orphan_timeout_secs.map(Duration::from_secs)
    }
}

impl ForgelinkConfig {
    /// Load config from a YAML file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: ForgelinkConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `~/.config/forgelink/config.yaml`
    pub async fn load_default() -> Result<Self> {
        let paths = ForgelinkPaths::new()?;
        Self::load(&paths.config_file()).await
    }

    /// Save config as YAML, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_yaml::to_string(self)?;
        tokio::fs::write(path, contents).await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(LinkError::Config("api.endpoint must not be empty".to_string()));
        }
        if self.popup.orphan_timeout_secs == Some(0) {
            return Err(LinkError::Config(
                "popup.orphan_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

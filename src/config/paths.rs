use std::path::PathBuf;

use crate::error::{LinkError, Result};

/// Filesystem locations for forgelink configuration
#[derive(Debug, Clone)]
pub struct ForgelinkPaths {
    pub config_dir: PathBuf,
}

impl ForgelinkPaths {
    /// Use ~/.config/forgelink
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| LinkError::Config("Could not determine home directory".to_string()))?;
        Ok(Self::with_dir(home.join(".config").join("forgelink")))
    }

    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Path to the config.yaml file
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.yaml")
    }
}

use thiserror::Error;

use crate::adapters::RemoteError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Authorization popup could not be opened")]
    PopupBlocked,

    #[error("Authorization popup closed without completing")]
    PopupTimedOut,

    #[error("No git organization selected")]
    NoOrganizationSelected,

    #[error("No async runtime to run the binding call on")]
    NoRuntime,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;

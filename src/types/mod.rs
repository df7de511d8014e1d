//! Core types for forgelink

pub mod request;
pub mod org;
pub mod repo;

use serde::{Deserialize, Serialize};

pub use request::{
    BindingOutcome, BindingRequest, ConnectedRepository, CreateRepositoryRequest,
    CreatedRepository, SelectRepositoryRequest,
};
pub use org::GitOrganization;
pub use repo::{GitRepository, Resource};

/// Supported git providers
///
/// Serialized with the enum names the remote service uses; displayed and
/// parsed in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GitProvider {
    Github,
    Bitbucket,
    GitLab,
    AwsCodeCommit,
    AzureDevOps,
}

/// Whether a repository belongs to an organization account or a personal one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OwnershipScope {
    #[default]
    Organization,
    User,
}

impl std::fmt::Display for GitProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitProvider::Github => write!(f, "github"),
            GitProvider::Bitbucket => write!(f, "bitbucket"),
            GitProvider::GitLab => write!(f, "gitlab"),
            GitProvider::AwsCodeCommit => write!(f, "awscodecommit"),
            GitProvider::AzureDevOps => write!(f, "azuredevops"),
        }
    }
}

impl std::str::FromStr for GitProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(GitProvider::Github),
            "bitbucket" => Ok(GitProvider::Bitbucket),
            "gitlab" => Ok(GitProvider::GitLab),
            "awscodecommit" | "codecommit" => Ok(GitProvider::AwsCodeCommit),
            "azuredevops" | "azure" => Ok(GitProvider::AzureDevOps),
            _ => Err(format!("Unknown git provider: {}", s)),
        }
    }
}

//! Repository link types

use serde::{Deserialize, Serialize};

use super::GitOrganization;

/// A remote repository a resource is linked to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    pub id: String,

    /// Owning organization, as it was when the link was fetched
    #[serde(rename = "gitOrganization")]
    pub organization: GitOrganization,
}

/// The resource being bound. Owned by the host application.
///
/// A resource carries at most one repository link; binding again replaces it
/// on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,

    #[serde(default)]
    pub git_repository: Option<GitRepository>,
}

impl Resource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            git_repository: None,
        }
    }

    pub fn with_repository(mut self, repository: GitRepository) -> Self {
        self.git_repository = Some(repository);
        self
    }

    /// Organization of the linked repository, if any
    pub fn linked_organization(&self) -> Option<&GitOrganization> {
        self.git_repository.as_ref().map(|r| &r.organization)
    }
}

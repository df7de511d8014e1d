use serde::{Deserialize, Serialize};

use super::GitProvider;

/// A provider-side account or group that owns repositories.
///
/// Snapshots are fetched by the host application and only ever read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitOrganization {
    pub id: String,
    pub provider: GitProvider,
    pub name: String,
    /// Repositories are listed under groups (GitLab groups, Bitbucket projects)
    #[serde(default, rename = "useGroupingForRepositories")]
    pub uses_grouping_for_repositories: bool,
}

impl GitOrganization {
    pub fn new(id: impl Into<String>, provider: GitProvider, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider,
            name: name.into(),
            uses_grouping_for_repositories: false,
        }
    }

    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.uses_grouping_for_repositories = grouping;
        self
    }
}

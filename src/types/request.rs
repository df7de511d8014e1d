//! Binding requests and their outcomes

use serde::{Deserialize, Serialize};

use super::GitProvider;

/// Create a new repository under an organization and bind it to a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    pub is_public: bool,
    pub organization_id: String,
    pub provider: GitProvider,
    pub resource_id: String,
}

/// Bind a resource to a repository that already exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectRepositoryRequest {
    pub repository_name: String,
    pub organization_id: String,
    pub resource_id: String,
}

/// A single user binding action. Consumed by value on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BindingRequest {
    CreateRepository(CreateRepositoryRequest),
    SelectRepository(SelectRepositoryRequest),
}

impl BindingRequest {
    pub fn resource_id(&self) -> &str {
        match self {
            BindingRequest::CreateRepository(r) => &r.resource_id,
            BindingRequest::SelectRepository(r) => &r.resource_id,
        }
    }

    pub fn organization_id(&self) -> &str {
        match self {
            BindingRequest::CreateRepository(r) => &r.organization_id,
            BindingRequest::SelectRepository(r) => &r.organization_id,
        }
    }
}

impl From<CreateRepositoryRequest> for BindingRequest {
    fn from(request: CreateRepositoryRequest) -> Self {
        BindingRequest::CreateRepository(request)
    }
}

impl From<SelectRepositoryRequest> for BindingRequest {
    fn from(request: SelectRepositoryRequest) -> Self {
        BindingRequest::SelectRepository(request)
    }
}

/// A repository created by the binding service and bound to the resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRepository {
    pub binding_id: String,
    pub repository_id: String,
}

/// The binding made to an existing repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedRepository {
    pub binding_id: String,
    pub repository_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingOutcome {
    Created(CreatedRepository),
    Connected(ConnectedRepository),
}

impl BindingOutcome {
    pub fn binding_id(&self) -> &str {
        match self {
            BindingOutcome::Created(c) => &c.binding_id,
            BindingOutcome::Connected(c) => &c.binding_id,
        }
    }
}

//! RemotePort trait - the client-side contract with the binding service
//!
//! The service behind this trait issues provider installation URLs and
//! performs the repository mutations. Transport is up to the implementor:
//! - GraphqlRemote: HTTP GraphQL client
//! - MockRemote: call-logging double for tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ConnectedRepository, CreatedRepository, GitProvider, OwnershipScope};

/// Errors that can occur when talking to the binding service
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Authentication failed (401)
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Network/connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Server error (5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The service answered but rejected the operation
    #[error("{0}")]
    Application(String),

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Network(err.to_string())
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Installation URL to open in the authorization popup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationUrl {
    pub url: String,
}

/// Variables of the create-repository mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepositoryInput {
    pub name: String,
    pub public: bool,
    pub git_organization_id: String,
    pub git_provider: GitProvider,
    pub resource_id: String,
    pub git_organization_type: OwnershipScope,
}

/// Variables of the connect-repository mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRepositoryInput {
    pub name: String,
    pub git_organization_id: String,
    pub resource_id: String,
}

/// Remote operations consumed by the binding flow
#[async_trait]
pub trait RemotePort: Send + Sync {
    /// Get the URL that starts the provider's app installation / OAuth flow
    async fn request_authorization_url(
        &self,
        provider: GitProvider,
    ) -> RemoteResult<AuthorizationUrl>;

    /// Create a repository under an organization and bind it to the resource
    async fn create_repository(
        &self,
        input: &CreateRepositoryInput,
    ) -> RemoteResult<CreatedRepository>;

    /// Bind the resource to an existing repository
    async fn connect_repository(
        &self,
        input: &ConnectRepositoryInput,
    ) -> RemoteResult<ConnectedRepository>;
}

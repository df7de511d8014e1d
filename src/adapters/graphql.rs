//! GraphQL client implementing `RemotePort`
//!
//! Talks to the binding service's GraphQL endpoint over HTTP.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::types::{ConnectedRepository, CreatedRepository, GitProvider};

use super::remote_port::{
    AuthorizationUrl, ConnectRepositoryInput, CreateRepositoryInput, RemoteError, RemotePort,
    RemoteResult,
};

const INSTALLATION_URL_MUTATION: &str = r"
mutation getGitResourceInstallationUrl($gitProvider: EnumGitProvider!) {
  getGitResourceInstallationUrl(data: { gitProvider: $gitProvider }) {
    url
  }
}";

const CREATE_REPOSITORY_MUTATION: &str = r"
mutation createGitRepository(
  $gitProvider: EnumGitProvider!
  $gitOrganizationId: String!
  $gitOrganizationType: EnumGitOrganizationType!
  $resourceId: String!
  $name: String!
  $public: Boolean!
) {
  createGitRepository(
    data: {
      name: $name
      public: $public
      gitOrganizationId: $gitOrganizationId
      resourceId: $resourceId
      gitProvider: $gitProvider
      gitOrganizationType: $gitOrganizationType
    }
  ) {
    id
    gitRepository {
      id
    }
  }
}";

const CONNECT_REPOSITORY_MUTATION: &str = r"
mutation connectGitRepository(
  $name: String!
  $gitOrganizationId: String!
  $resourceId: String!
) {
  connectResourceGitRepository(
    data: { name: $name, resourceId: $resourceId, gitOrganizationId: $gitOrganizationId }
  ) {
    id
    gitRepository {
      id
    }
  }
}";

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallationUrlVariables {
    git_provider: GitProvider,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallationUrlData {
    get_git_resource_installation_url: AuthorizationUrl,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindingPayload {
    id: String,
    git_repository: Option<RepositoryRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRepositoryData {
    create_git_repository: BindingPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectRepositoryData {
    connect_resource_git_repository: BindingPayload,
}

/// Unwrap a GraphQL envelope; `errors` wins over partial `data`
fn decode<T>(response: GraphqlResponse<T>) -> RemoteResult<T> {
    if !response.errors.is_empty() {
        let message = response
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RemoteError::Application(message));
    }
    response
        .data
        .ok_or_else(|| RemoteError::MalformedResponse("response has neither data nor errors".to_string()))
}

/// Binding service client over GraphQL
pub struct GraphqlRemote {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl GraphqlRemote {
    pub fn new(endpoint: impl Into<String>) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_headers(&self) -> RemoteResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("forgelink"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                RemoteError::AuthenticationFailed {
                    message: format!("Invalid token format: {}", e),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn execute<V: Serialize + Send + Sync, T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: V,
    ) -> RemoteResult<T> {
        debug!(operation, endpoint = %self.endpoint, "Sending GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.build_headers()?)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => RemoteError::AuthenticationFailed { message: body },
                500..=599 => RemoteError::Server {
                    status: status.as_u16(),
                    message: body,
                },
                code => RemoteError::Api {
                    status: code,
                    message: body,
                },
            });
        }

        let envelope: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;
        decode(envelope)
    }
}

#[async_trait]
impl RemotePort for GraphqlRemote {
    async fn request_authorization_url(
        &self,
        provider: GitProvider,
    ) -> RemoteResult<AuthorizationUrl> {
        let data: InstallationUrlData = self
            .execute(
                "getGitResourceInstallationUrl",
                INSTALLATION_URL_MUTATION,
                InstallationUrlVariables {
                    git_provider: provider,
                },
            )
            .await?;
        Ok(data.get_git_resource_installation_url)
    }

    async fn create_repository(
        &self,
        input: &CreateRepositoryInput,
    ) -> RemoteResult<CreatedRepository> {
        let data: CreateRepositoryData = self
            .execute("createGitRepository", CREATE_REPOSITORY_MUTATION, input)
            .await?;
        let payload = data.create_git_repository;
        let repository = payload.git_repository.ok_or_else(|| {
            RemoteError::MalformedResponse("createGitRepository returned no repository".to_string())
        })?;

        Ok(CreatedRepository {
            binding_id: payload.id,
            repository_id: repository.id,
        })
    }

    async fn connect_repository(
        &self,
        input: &ConnectRepositoryInput,
    ) -> RemoteResult<ConnectedRepository> {
        let data: ConnectRepositoryData = self
            .execute("connectGitRepository", CONNECT_REPOSITORY_MUTATION, input)
            .await?;
        let payload = data.connect_resource_git_repository;

        Ok(ConnectedRepository {
            binding_id: payload.id,
            repository_id: payload.git_repository.map(|r| r.id),
        })
    }
}

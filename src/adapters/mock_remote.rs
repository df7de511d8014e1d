//! Mock RemotePort implementation for testing
//!
//! Records every call and returns configurable responses, so binding and
//! orchestration logic can be exercised without a network.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::sync::lock;
use crate::types::{ConnectedRepository, CreatedRepository, GitProvider};

use super::remote_port::{
    AuthorizationUrl, ConnectRepositoryInput, CreateRepositoryInput, RemoteError, RemotePort,
    RemoteResult,
};

/// Errors that can be configured for the mock
#[derive(Debug, Clone)]
pub enum MockError {
    AuthenticationFailed(String),
    Network(String),
    Application(String),
    Server { status: u16, message: String },
}

impl From<MockError> for RemoteError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::AuthenticationFailed(message) => RemoteError::AuthenticationFailed { message },
            MockError::Network(message) => RemoteError::Network(message),
            MockError::Application(message) => RemoteError::Application(message),
            MockError::Server { status, message } => RemoteError::Server { status, message },
        }
    }
}

/// Record of a call made to the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    RequestAuthorizationUrl { provider: GitProvider },
    CreateRepository(CreateRepositoryInput),
    ConnectRepository(ConnectRepositoryInput),
}

#[derive(Debug, Default)]
struct MockState {
    authorization_url: Option<String>,
    error: Option<MockError>,
    calls: Vec<MockCall>,
}

/// A mock implementation of RemotePort for testing purposes
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
    connect_gate: Option<Arc<Notify>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL returned from `request_authorization_url`
    pub fn with_authorization_url(self, url: &str) -> Self {
        lock(&self.state).authorization_url = Some(url.to_string());
        self
    }

    /// Configure an error to return from all operations
    pub fn with_error(self, error: MockError) -> Self {
        lock(&self.state).error = Some(error);
        self
    }

    /// Make `connect_repository` wait until the returned `Notify` fires
    pub fn with_connect_gate(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.connect_gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    /// Get the call log for verification
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.state).calls.clone()
    }

    pub fn create_calls(&self) -> Vec<CreateRepositoryInput> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::CreateRepository(input) => Some(input),
                _ => None,
            })
            .collect()
    }

    pub fn connect_calls(&self) -> Vec<ConnectRepositoryInput> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::ConnectRepository(input) => Some(input),
                _ => None,
            })
            .collect()
    }

    fn log_call(&self, call: MockCall) {
        lock(&self.state).calls.push(call);
    }

    fn check_error(&self) -> RemoteResult<()> {
        match &lock(&self.state).error {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemotePort for MockRemote {
    async fn request_authorization_url(
        &self,
        provider: GitProvider,
    ) -> RemoteResult<AuthorizationUrl> {
        self.log_call(MockCall::RequestAuthorizationUrl { provider });
        self.check_error()?;

        let url = lock(&self.state)
            .authorization_url
            .clone()
            .unwrap_or_else(|| format!("https://mock.example.com/install/{}", provider));
        Ok(AuthorizationUrl { url })
    }

    async fn create_repository(
        &self,
        input: &CreateRepositoryInput,
    ) -> RemoteResult<CreatedRepository> {
        self.log_call(MockCall::CreateRepository(input.clone()));
        self.check_error()?;

        Ok(CreatedRepository {
            binding_id: format!("binding-{}", input.resource_id),
            repository_id: format!("repo-{}", input.name),
        })
    }

    async fn connect_repository(
        &self,
        input: &ConnectRepositoryInput,
    ) -> RemoteResult<ConnectedRepository> {
        self.log_call(MockCall::ConnectRepository(input.clone()));
        if let Some(gate) = &self.connect_gate {
            gate.notified().await;
        }
        self.check_error()?;

        Ok(ConnectedRepository {
            binding_id: format!("binding-{}", input.resource_id),
            repository_id: Some(format!("repo-{}", input.name)),
        })
    }
}

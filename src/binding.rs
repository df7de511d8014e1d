//! Repository binding
//!
//! Turns a `BindingRequest` into exactly one remote call. The create path
//! exposes loading/error state for the form that submitted it; the select
//! path is fire-and-forget from the caller's point of view.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::adapters::{ConnectRepositoryInput, CreateRepositoryInput, RemotePort};
use crate::error::Result;
use crate::sync::lock;
use crate::types::{
    BindingOutcome, BindingRequest, CreateRepositoryRequest, OwnershipScope,
    SelectRepositoryRequest,
};

/// State of the most recent create submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Create status plus the generation of the submission allowed to write it
#[derive(Default)]
struct CreateTracker {
    status: CreateStatus,
    generation: u64,
}

pub struct RepositoryBindingController {
    remote: Arc<dyn RemotePort>,
    create: Mutex<CreateTracker>,
}

impl RepositoryBindingController {
    pub fn new(remote: Arc<dyn RemotePort>) -> Self {
        Self {
            remote,
            create: Mutex::new(CreateTracker::default()),
        }
    }

    pub fn create_status(&self) -> CreateStatus {
        lock(&self.create).status.clone()
    }

    /// Issue the remote call for `request`. No retries.
    pub async fn submit(&self, request: BindingRequest) -> Result<BindingOutcome> {
        match request {
            BindingRequest::CreateRepository(request) => self.create(request).await,
            BindingRequest::SelectRepository(request) => self.connect(request).await,
        }
    }

    async fn create(&self, request: CreateRepositoryRequest) -> Result<BindingOutcome> {
        let input = CreateRepositoryInput {
            name: request.name,
            public: request.is_public,
            git_organization_id: request.organization_id,
            git_provider: request.provider,
            resource_id: request.resource_id,
            git_organization_type: OwnershipScope::Organization,
        };

        let generation = {
            let mut tracker = lock(&self.create);
            tracker.generation += 1;
            tracker.status = CreateStatus {
                loading: true,
                error: None,
            };
            tracker.generation
        };

        let result = self.remote.create_repository(&input).await;

        // Only the latest submission owns the status
        let mut tracker = lock(&self.create);
        let latest = tracker.generation == generation;
        if latest {
            tracker.status.loading = false;
        } else {
            debug!(
                resource = %input.resource_id,
                name = %input.name,
                "Superseded create finished; status left to the newer submission"
            );
        }
        match result {
            Ok(created) => {
                info!(
                    resource = %input.resource_id,
                    organization = %input.git_organization_id,
                    repository = %created.repository_id,
                    "Repository created and bound"
                );
                Ok(BindingOutcome::Created(created))
            }
            Err(e) => {
                warn!(
                    resource = %input.resource_id,
                    name = %input.name,
                    error = %e,
                    "Repository creation failed"
                );
                if latest {
                    tracker.status.error = Some(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    async fn connect(&self, request: SelectRepositoryRequest) -> Result<BindingOutcome> {
        let input = ConnectRepositoryInput {
            name: request.repository_name,
            git_organization_id: request.organization_id,
            resource_id: request.resource_id,
        };

        match self.remote.connect_repository(&input).await {
            Ok(connected) => {
                info!(
                    resource = %input.resource_id,
                    name = %input.name,
                    "Existing repository bound"
                );
                Ok(BindingOutcome::Connected(connected))
            }
            Err(e) => {
                warn!(
                    resource = %input.resource_id,
                    name = %input.name,
                    error = %e,
                    "Repository connection failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        AuthorizationUrl, ConnectedRepository, CreatedRepository, MockCall, MockError,
        MockRemote, RemoteError, RemoteResult,
    };
    use crate::error::LinkError;
    use crate::types::GitProvider;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    /// Each create call waits for the result queued for it, in call order
    #[derive(Default)]
    struct ScriptedCreates {
        pending: Mutex<VecDeque<oneshot::Receiver<RemoteResult<CreatedRepository>>>>,
    }

    impl ScriptedCreates {
        fn queue(&self) -> oneshot::Sender<RemoteResult<CreatedRepository>> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push_back(rx);
            tx
        }

        fn waiting(&self) -> usize {
            self.pending.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemotePort for ScriptedCreates {
        async fn request_authorization_url(
            &self,
            provider: GitProvider,
        ) -> RemoteResult<AuthorizationUrl> {
            Ok(AuthorizationUrl {
                url: format!("https://install.example.com/{}", provider),
            })
        }

        async fn create_repository(
            &self,
            _input: &CreateRepositoryInput,
        ) -> RemoteResult<CreatedRepository> {
            let next = self.pending.lock().unwrap().pop_front();
            match next {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(RemoteError::Network("dropped".to_string()))),
                None => Err(RemoteError::Network("unexpected call".to_string())),
            }
        }

        async fn connect_repository(
            &self,
            input: &ConnectRepositoryInput,
        ) -> RemoteResult<ConnectedRepository> {
            Ok(ConnectedRepository {
                binding_id: format!("binding-{}", input.resource_id),
                repository_id: None,
            })
        }
    }

    async fn until_waiting(remote: &ScriptedCreates, remaining: usize) {
        while remote.waiting() > remaining {
            tokio::task::yield_now().await;
        }
    }

    fn create_request() -> BindingRequest {
        BindingRequest::CreateRepository(CreateRepositoryRequest {
            name: "svc-a".to_string(),
            is_public: false,
            organization_id: "org1".to_string(),
            provider: GitProvider::Github,
            resource_id: "res1".to_string(),
        })
    }

    #[tokio::test]
    async fn test_create_issues_one_call_with_all_fields() {
        let remote = MockRemote::new();
        let controller = RepositoryBindingController::new(Arc::new(remote.clone()));

        let outcome = controller.submit(create_request()).await.unwrap();

        assert_eq!(
            remote.calls(),
            vec![MockCall::CreateRepository(CreateRepositoryInput {
                name: "svc-a".to_string(),
                public: false,
                git_organization_id: "org1".to_string(),
                git_provider: GitProvider::Github,
                resource_id: "res1".to_string(),
                git_organization_type: OwnershipScope::Organization,
            })]
        );
        assert_eq!(outcome.binding_id(), "binding-res1");
        assert_eq!(controller.create_status(), CreateStatus::default());
    }

    #[tokio::test]
    async fn test_create_failure_sets_error_without_retry() {
        let remote = MockRemote::new().with_error(MockError::Application("name taken".to_string()));
        let controller = RepositoryBindingController::new(Arc::new(remote.clone()));

        let result = controller.submit(create_request()).await;

        assert!(matches!(result, Err(LinkError::Remote(_))));
        assert_eq!(remote.create_calls().len(), 1);
        assert_eq!(
            controller.create_status(),
            CreateStatus {
                loading: false,
                error: Some("name taken".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_new_create_clears_previous_error() {
        let remote = MockRemote::new().with_error(MockError::Network("offline".to_string()));
        let controller = RepositoryBindingController::new(Arc::new(remote.clone()));
        assert!(controller.submit(create_request()).await.is_err());

        remote.clear_error();
        assert!(controller.submit(create_request()).await.is_ok());
        assert!(controller.create_status().error.is_none());
        assert_eq!(remote.create_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_older_create_failure_does_not_clobber_newer_submission() {
        let remote = Arc::new(ScriptedCreates::default());
        let first_result = remote.queue();
        let second_result = remote.queue();
        let controller = Arc::new(RepositoryBindingController::new(remote.clone()));

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit(create_request()).await }
        });
        until_waiting(&remote, 1).await;
        let second = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit(create_request()).await }
        });
        until_waiting(&remote, 0).await;

        first_result
            .send(Err(RemoteError::Application("first failed".to_string())))
            .unwrap();
        assert!(first.await.unwrap().is_err());
        assert_eq!(
            controller.create_status(),
            CreateStatus {
                loading: true,
                error: None,
            }
        );

        second_result
            .send(Ok(CreatedRepository {
                binding_id: "binding-res1".to_string(),
                repository_id: "repo-svc-a".to_string(),
            }))
            .unwrap();
        assert!(second.await.unwrap().is_ok());
        assert_eq!(controller.create_status(), CreateStatus::default());
    }

    #[tokio::test]
    async fn test_latest_create_failure_is_reported() {
        let remote = Arc::new(ScriptedCreates::default());
        let first_result = remote.queue();
        let second_result = remote.queue();
        let controller = Arc::new(RepositoryBindingController::new(remote.clone()));

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit(create_request()).await }
        });
        until_waiting(&remote, 1).await;
        let second = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit(create_request()).await }
        });
        until_waiting(&remote, 0).await;

        second_result
            .send(Err(RemoteError::Application("name taken".to_string())))
            .unwrap();
        assert!(second.await.unwrap().is_err());

        // The older success arrives last and must not wipe the error
        first_result
            .send(Ok(CreatedRepository {
                binding_id: "binding-res1".to_string(),
                repository_id: "repo-svc-a".to_string(),
            }))
            .unwrap();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(
            controller.create_status(),
            CreateStatus {
                loading: false,
                error: Some("name taken".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_select_connects_existing_repository() {
        let remote = MockRemote::new();
        let controller = RepositoryBindingController::new(Arc::new(remote.clone()));

        let outcome = controller
            .submit(BindingRequest::SelectRepository(SelectRepositoryRequest {
                repository_name: "svc-b".to_string(),
                organization_id: "org1".to_string(),
                resource_id: "res1".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(
            remote.calls(),
            vec![MockCall::ConnectRepository(ConnectRepositoryInput {
                name: "svc-b".to_string(),
                git_organization_id: "org1".to_string(),
                resource_id: "res1".to_string(),
            })]
        );
        assert!(matches!(outcome, BindingOutcome::Connected(_)));
        // Select path leaves create status alone
        assert_eq!(controller.create_status(), CreateStatus::default());
    }
}

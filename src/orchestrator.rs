//! Top-level flow: provider authorization plus repository binding
//!
//! Two state machines run side by side. The binding flow goes
//! `NoOrganization -> OrganizationChosen -> RepositoryPickerOpen |
//! RepositoryCreateOpen -> (submit) -> OrganizationChosen`. The popup flow
//! (see `PopupPhase`) starts whenever a new provider connection is requested.
//! The orchestrator only routes intents and owns dialog state; remote calls
//! live in the binding controller and the popup coordinator.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::adapters::RemotePort;
use crate::binding::{CreateStatus, RepositoryBindingController};
use crate::error::{LinkError, Result};
use crate::events::SessionListener;
use crate::organization::OrganizationSelection;
use crate::popup::{
    HostMessage, PopupAuthCoordinator, PopupFailure, PopupPhase, SessionCallbacks, SessionToken,
};
use crate::sync::lock;
use crate::types::{
    BindingOutcome, CreateRepositoryRequest, GitOrganization, GitProvider, Resource,
    SelectRepositoryRequest,
};

/// The one transient dialog that may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveDialog {
    #[default]
    None,
    OrganizationPicker,
    RepositoryPicker,
    RepositoryCreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    NoOrganization,
    OrganizationChosen,
    RepositoryPickerOpen,
    RepositoryCreateOpen,
}

struct OrchestratorState {
    resource: Resource,
    organizations: Vec<GitOrganization>,
    selection: OrganizationSelection,
    dialog: ActiveDialog,
    popup_blocked_notice: bool,
}

impl OrchestratorState {
    fn reconcile(&mut self) {
        let linked = self.resource.git_repository.as_ref();
        if self.selection.reconcile(&self.organizations, linked) {
            debug!(
                organization = ?self.selection.current().map(|o| &o.id),
                "Derived git organization"
            );
        }
    }
}

pub struct AuthSessionOrchestrator {
    state: Arc<Mutex<OrchestratorState>>,
    popup: Arc<PopupAuthCoordinator>,
    binding: Arc<RepositoryBindingController>,
    remote: Arc<dyn RemotePort>,
    listener: Arc<dyn SessionListener>,
    window_title: String,
}

impl AuthSessionOrchestrator {
    pub fn new(
        resource: Resource,
        organizations: Vec<GitOrganization>,
        remote: Arc<dyn RemotePort>,
        popup: PopupAuthCoordinator,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        let mut state = OrchestratorState {
            resource,
            organizations,
            selection: OrganizationSelection::new(),
            dialog: ActiveDialog::None,
            popup_blocked_notice: false,
        };
        state.reconcile();

        Self {
            state: Arc::new(Mutex::new(state)),
            popup: Arc::new(popup),
            binding: Arc::new(RepositoryBindingController::new(Arc::clone(&remote))),
            remote,
            listener,
            window_title: crate::config::DEFAULT_WINDOW_TITLE.to_string(),
        }
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    // --- organization ---

    pub fn current_organization(&self) -> Option<GitOrganization> {
        lock(&self.state).selection.current().cloned()
    }

    pub fn organizations(&self) -> Vec<GitOrganization> {
        lock(&self.state).organizations.clone()
    }

    /// No provider connection exists yet
    pub fn has_connections(&self) -> bool {
        !lock(&self.state).organizations.is_empty()
    }

    /// The workspace's organizations changed
    pub fn set_organizations(&self, organizations: Vec<GitOrganization>) {
        let mut state = lock(&self.state);
        state.organizations = organizations;
        state.reconcile();
    }

    /// The resource (and so possibly its repository link) changed
    pub fn set_resource(&self, resource: Resource) {
        let mut state = lock(&self.state);
        state.resource = resource;
        state.reconcile();
    }

    /// Explicit user choice; later re-derivation will not override it
    pub fn select_organization(&self, organization: GitOrganization) {
        debug!(organization = %organization.id, "Git organization selected");
        lock(&self.state).selection.choose(organization);
    }

    // --- dialogs ---

    pub fn active_dialog(&self) -> ActiveDialog {
        lock(&self.state).dialog
    }

    pub fn flow_state(&self) -> FlowState {
        let state = lock(&self.state);
        match (state.selection.current(), state.dialog) {
            (None, _) => FlowState::NoOrganization,
            (Some(_), ActiveDialog::RepositoryPicker) => FlowState::RepositoryPickerOpen,
            (Some(_), ActiveDialog::RepositoryCreate) => FlowState::RepositoryCreateOpen,
            (Some(_), _) => FlowState::OrganizationChosen,
        }
    }

    pub fn open_organization_picker(&self) {
        lock(&self.state).dialog = ActiveDialog::OrganizationPicker;
    }

    pub fn open_repository_picker(&self) -> Result<()> {
        self.open_repository_dialog(ActiveDialog::RepositoryPicker)
    }

    pub fn open_repository_create(&self) -> Result<()> {
        self.open_repository_dialog(ActiveDialog::RepositoryCreate)
    }

    fn open_repository_dialog(&self, dialog: ActiveDialog) -> Result<()> {
        let mut state = lock(&self.state);
        if state.selection.current().is_none() {
            return Err(LinkError::NoOrganizationSelected);
        }
        state.dialog = dialog;
        Ok(())
    }

    pub fn close_dialog(&self) {
        lock(&self.state).dialog = ActiveDialog::None;
    }

    /// Whether the "popup blocked" notice is showing
    pub fn popup_blocked_notice(&self) -> bool {
        lock(&self.state).popup_blocked_notice
    }

    pub fn dismiss_popup_notice(&self) {
        lock(&self.state).popup_blocked_notice = false;
    }

    // --- provider authorization ---

    /// Request an installation URL and open it in the authorization popup.
    ///
    /// Blocking, completion and timeout are reported through the listener.
    pub async fn connect_provider(&self, provider: GitProvider) -> Result<SessionToken> {
        {
            let mut state = lock(&self.state);
            if state.dialog == ActiveDialog::OrganizationPicker {
                state.dialog = ActiveDialog::None;
            }
        }

        let authorization = match self.remote.request_authorization_url(provider).await {
            Ok(authorization) => authorization,
            Err(e) => {
                warn!(provider = %provider, error = %e, "Could not get authorization URL");
                self.listener.on_error(&e.to_string());
                return Err(e.into());
            }
        };

        let on_done = Arc::clone(&self.listener);
        let on_failed = Arc::clone(&self.listener);
        let state = Arc::clone(&self.state);
        let callbacks = SessionCallbacks::new(
            move || on_done.on_done(),
            move |failure| match failure {
                PopupFailure::Blocked => {
                    lock(&state).popup_blocked_notice = true;
                    on_failed.on_popup_blocked();
                }
                PopupFailure::TimedOut => {
                    on_failed.on_error(&LinkError::from(failure).to_string());
                }
            },
        );

        Ok(self
            .popup
            .start_session(&authorization.url, &self.window_title, callbacks))
    }

    /// Feed a message posted by the authorization popup
    pub fn receive_message(&self, message: &HostMessage) -> bool {
        self.popup.receive_message(message)
    }

    pub fn popup_phase(&self) -> PopupPhase {
        self.popup.phase()
    }

    // --- repository binding ---

    pub fn create_status(&self) -> CreateStatus {
        self.binding.create_status()
    }

    /// Create a repository in the current organization and bind it.
    ///
    /// On success the create dialog closes; on failure it stays open and the
    /// error is reported.
    pub async fn create_repository(
        &self,
        name: impl Into<String>,
        is_public: bool,
    ) -> Result<BindingOutcome> {
        let (organization, resource_id) = {
            let state = lock(&self.state);
            (state.selection.current().cloned(), state.resource.id.clone())
        };
        let Some(organization) = organization else {
            return Err(LinkError::NoOrganizationSelected);
        };

        let request = CreateRepositoryRequest {
            name: name.into(),
            is_public,
            organization_id: organization.id,
            provider: organization.provider,
            resource_id: resource_id.clone(),
        };

        match self.binding.submit(request.into()).await {
            Ok(outcome) => {
                {
                    let mut state = lock(&self.state);
                    if state.dialog == ActiveDialog::RepositoryCreate {
                        state.dialog = ActiveDialog::None;
                    }
                }
                self.listener.on_repository_bound(&resource_id);
                Ok(outcome)
            }
            Err(e) => {
                self.listener.on_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Bind to an existing repository.
    ///
    /// The picker closes right away; the remote call runs on its own task and
    /// reports through the listener. Outside a tokio runtime nothing changes
    /// and `NoRuntime` is returned.
    pub fn select_repository(
        &self,
        repository_name: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Result<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime; repository selection not submitted");
            return Err(LinkError::NoRuntime);
        };

        let resource_id = {
            let mut state = lock(&self.state);
            if state.dialog == ActiveDialog::RepositoryPicker {
                state.dialog = ActiveDialog::None;
            }
            state.resource.id.clone()
        };

        let request = SelectRepositoryRequest {
            repository_name: repository_name.into(),
            organization_id: organization_id.into(),
            resource_id: resource_id.clone(),
        };
        let binding = Arc::clone(&self.binding);
        let listener = Arc::clone(&self.listener);

        Ok(runtime.spawn(async move {
            match binding.submit(request.into()).await {
                Ok(_) => listener.on_repository_bound(&resource_id),
                Err(e) => listener.on_error(&e.to_string()),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockCall, MockError, MockRemote};
    use crate::events::{ChannelListener, LinkEvent};
    use crate::popup::MockPopupHost;
    use crate::types::GitRepository;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn org(id: &str) -> GitOrganization {
        GitOrganization::new(id, GitProvider::Github, format!("{}-name", id))
    }

    struct Fixture {
        orchestrator: AuthSessionOrchestrator,
        remote: MockRemote,
        host: Arc<MockPopupHost>,
        events: UnboundedReceiver<LinkEvent>,
    }

    fn fixture_with(remote: MockRemote, organizations: Vec<GitOrganization>) -> Fixture {
        let host = Arc::new(MockPopupHost::new());
        let (listener, events) = ChannelListener::new();
        let orchestrator = AuthSessionOrchestrator::new(
            Resource::new("res1"),
            organizations,
            Arc::new(remote.clone()),
            PopupAuthCoordinator::new(host.clone()),
            Arc::new(listener),
        );
        Fixture {
            orchestrator,
            remote,
            host,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockRemote::new(), vec![org("org1")])
    }

    fn completion() -> HostMessage {
        HostMessage::new("https://app.example.com", json!({ "completed": true }))
    }

    #[test]
    fn test_initial_organization_from_single_connection() {
        let f = fixture();
        assert_eq!(f.orchestrator.current_organization(), Some(org("org1")));
        assert_eq!(f.orchestrator.flow_state(), FlowState::OrganizationChosen);
        assert!(f.orchestrator.has_connections());
    }

    #[test]
    fn test_no_initial_organization_with_many_connections() {
        let f = fixture_with(MockRemote::new(), vec![org("org1"), org("org2")]);
        assert!(f.orchestrator.current_organization().is_none());
        assert_eq!(f.orchestrator.flow_state(), FlowState::NoOrganization);
        assert!(matches!(
            f.orchestrator.open_repository_create(),
            Err(LinkError::NoOrganizationSelected)
        ));
    }

    #[test]
    fn test_linked_resource_sets_organization() {
        let f = fixture_with(MockRemote::new(), vec![org("org1"), org("org2")]);

        f.orchestrator.set_resource(Resource::new("res1").with_repository(GitRepository {
            id: "repo1".to_string(),
            organization: org("org2"),
        }));

        assert_eq!(f.orchestrator.current_organization(), Some(org("org2")));
    }

    #[test]
    fn test_explicit_selection_survives_new_organizations() {
        let f = fixture_with(MockRemote::new(), vec![]);
        assert!(!f.orchestrator.has_connections());

        f.orchestrator.select_organization(org("org2"));
        f.orchestrator.set_organizations(vec![org("org1")]);

        assert_eq!(f.orchestrator.current_organization(), Some(org("org2")));
    }

    #[test]
    fn test_dialogs_are_mutually_exclusive() {
        let f = fixture();

        f.orchestrator.open_repository_picker().unwrap();
        assert_eq!(f.orchestrator.flow_state(), FlowState::RepositoryPickerOpen);

        f.orchestrator.open_repository_create().unwrap();
        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::RepositoryCreate);
        assert_eq!(f.orchestrator.flow_state(), FlowState::RepositoryCreateOpen);

        f.orchestrator.open_organization_picker();
        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::OrganizationPicker);
        assert_eq!(f.orchestrator.flow_state(), FlowState::OrganizationChosen);

        f.orchestrator.close_dialog();
        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::None);
    }

    #[tokio::test]
    async fn test_connect_provider_opens_popup_and_reports_done() {
        let remote = MockRemote::new().with_authorization_url("https://github.com/apps/install");
        let mut f = fixture_with(remote, vec![]);
        f.orchestrator.open_organization_picker();

        f.orchestrator.connect_provider(GitProvider::Github).await.unwrap();

        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::None);
        assert_eq!(
            f.remote.calls(),
            vec![MockCall::RequestAuthorizationUrl {
                provider: GitProvider::Github
            }]
        );
        let opened = f.host.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].url, "https://github.com/apps/install");
        assert_eq!(opened[0].name, "auth with git");
        assert_eq!(f.orchestrator.popup_phase(), PopupPhase::WaitingForMessage);
        assert!(f.events.try_recv().is_err());

        assert!(f.orchestrator.receive_message(&completion()));
        assert_eq!(f.events.try_recv().unwrap(), LinkEvent::Done);
        assert!(f.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blocked_popup_shows_notice() {
        let mut f = fixture();
        f.host.set_blocked(true);

        f.orchestrator.connect_provider(GitProvider::GitLab).await.unwrap();

        assert_eq!(f.events.try_recv().unwrap(), LinkEvent::PopupBlocked);
        assert!(f.orchestrator.popup_blocked_notice());
        assert!(!f.orchestrator.receive_message(&completion()));
        assert!(f.events.try_recv().is_err());

        f.orchestrator.dismiss_popup_notice();
        assert!(!f.orchestrator.popup_blocked_notice());
    }

    #[tokio::test]
    async fn test_authorization_url_failure_is_reported() {
        let remote = MockRemote::new().with_error(MockError::Network("offline".to_string()));
        let mut f = fixture_with(remote, vec![]);

        let result = f.orchestrator.connect_provider(GitProvider::Github).await;

        assert!(matches!(result, Err(LinkError::Remote(_))));
        assert!(f.host.opened().is_empty());
        assert_eq!(
            f.events.try_recv().unwrap(),
            LinkEvent::Error {
                message: "Network error: offline".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_orphaned_popup_reports_error_when_timeout_configured() {
        let host = Arc::new(MockPopupHost::new());
        let (listener, mut events) = ChannelListener::new();
        let orchestrator = AuthSessionOrchestrator::new(
            Resource::new("res1"),
            vec![],
            Arc::new(MockRemote::new()),
            PopupAuthCoordinator::new(host).with_orphan_timeout(Duration::from_secs(30)),
            Arc::new(listener),
        );

        orchestrator.connect_provider(GitProvider::Github).await.unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        tokio::task::yield_now().await;
        assert!(events.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            events.try_recv().unwrap(),
            LinkEvent::Error {
                message: "Authorization popup closed without completing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_repository_closes_dialog_on_success() {
        let mut f = fixture();
        f.orchestrator.open_repository_create().unwrap();

        let outcome = f.orchestrator.create_repository("svc-a", false).await.unwrap();

        assert!(matches!(outcome, BindingOutcome::Created(_)));
        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::None);
        let calls = f.remote.create_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "svc-a");
        assert!(!calls[0].public);
        assert_eq!(calls[0].git_organization_id, "org1");
        assert_eq!(calls[0].git_provider, GitProvider::Github);
        assert_eq!(calls[0].resource_id, "res1");
        assert_eq!(
            f.events.try_recv().unwrap(),
            LinkEvent::RepositoryBound {
                resource_id: "res1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_repository_failure_keeps_dialog_open() {
        let remote = MockRemote::new().with_error(MockError::Application("already exists".to_string()));
        let mut f = fixture_with(remote, vec![org("org1")]);
        f.orchestrator.open_repository_create().unwrap();

        let result = f.orchestrator.create_repository("svc-a", true).await;

        assert!(result.is_err());
        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::RepositoryCreate);
        assert_eq!(f.orchestrator.create_status().error.as_deref(), Some("already exists"));
        assert_eq!(
            f.events.try_recv().unwrap(),
            LinkEvent::Error {
                message: "already exists".to_string()
            }
        );
        assert_eq!(f.remote.create_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_create_repository_requires_organization() {
        let f = fixture_with(MockRemote::new(), vec![]);

        let result = f.orchestrator.create_repository("svc-a", true).await;

        assert!(matches!(result, Err(LinkError::NoOrganizationSelected)));
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_select_repository_closes_picker_before_response() {
        let (remote, gate) = MockRemote::new().with_connect_gate();
        let mut f = fixture_with(remote, vec![org("org1")]);
        f.orchestrator.open_repository_picker().unwrap();

        let task = f.orchestrator.select_repository("svc-b", "org1").unwrap();

        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::None);
        assert!(f.events.try_recv().is_err());

        gate.notify_one();
        task.await.unwrap();

        assert_eq!(
            f.remote.connect_calls(),
            vec![crate::adapters::ConnectRepositoryInput {
                name: "svc-b".to_string(),
                git_organization_id: "org1".to_string(),
                resource_id: "res1".to_string(),
            }]
        );
        assert_eq!(
            f.events.try_recv().unwrap(),
            LinkEvent::RepositoryBound {
                resource_id: "res1".to_string()
            }
        );
    }

    #[test]
    fn test_select_repository_without_runtime_leaves_picker_open() {
        let mut f = fixture();
        f.orchestrator.open_repository_picker().unwrap();

        let result = f.orchestrator.select_repository("svc-b", "org1");

        assert!(matches!(result, Err(LinkError::NoRuntime)));
        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::RepositoryPicker);
        assert!(f.remote.calls().is_empty());
        assert!(f.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_select_repository_failure_reported_separately() {
        let remote = MockRemote::new().with_error(MockError::Server {
            status: 502,
            message: "bad gateway".to_string(),
        });
        let mut f = fixture_with(remote, vec![org("org1")]);
        f.orchestrator.open_repository_picker().unwrap();

        f.orchestrator
            .select_repository("svc-b", "org1")
            .unwrap()
            .await
            .unwrap();

        assert_eq!(f.orchestrator.active_dialog(), ActiveDialog::None);
        assert_eq!(
            f.events.try_recv().unwrap(),
            LinkEvent::Error {
                message: "Server error (502): bad gateway".to_string()
            }
        );
    }
}

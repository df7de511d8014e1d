//! Forgelink - git provider authorization and repository binding
//!
//! Connects a resource to a source-control provider through an authorization
//! popup, then binds it to a new or existing repository in one of the
//! provider's organizations.

pub mod adapters;
pub mod binding;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod organization;
pub mod popup;
mod sync;
pub mod types;

// Re-exports for convenience
pub use adapters::{GraphqlRemote, RemoteError, RemotePort};
pub use binding::{CreateStatus, RepositoryBindingController};
pub use config::ForgelinkConfig;
pub use error::{LinkError, Result};
pub use events::{ChannelListener, LinkEvent, SessionListener};
pub use orchestrator::{ActiveDialog, AuthSessionOrchestrator, FlowState};
pub use organization::{select_initial_organization, OrganizationSelection};
pub use popup::{
    HostMessage, PopupAuthCoordinator, PopupFailure, PopupHost, PopupPhase, PopupWindow,
    SessionCallbacks, SessionToken, WindowFeatures,
};
pub use types::*;

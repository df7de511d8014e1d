//! Notifications the binding flow sends back to its host application.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Receives the outcome of user-initiated actions
pub trait SessionListener: Send + Sync {
    /// The provider was connected (authorization popup reported completion)
    fn on_done(&self);

    /// The authorization popup could not be opened
    fn on_popup_blocked(&self);

    /// A binding action succeeded for the resource
    fn on_repository_bound(&self, resource_id: &str);

    /// A remote call or popup session failed
    fn on_error(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkEvent {
    /// Provider connected
    Done,

    /// Authorization popup blocked by the host
    PopupBlocked,

    /// Resource bound to a repository
    RepositoryBound { resource_id: String },

    /// Error
    Error { message: String },
}

/// `SessionListener` that forwards every notification as a `LinkEvent`
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: LinkEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

impl SessionListener for ChannelListener {
    fn on_done(&self) {
        self.send(LinkEvent::Done);
    }

    fn on_popup_blocked(&self) {
        self.send(LinkEvent::PopupBlocked);
    }

    fn on_repository_bound(&self, resource_id: &str) {
        self.send(LinkEvent::RepositoryBound {
            resource_id: resource_id.to_string(),
        });
    }

    fn on_error(&self, message: &str) {
        self.send(LinkEvent::Error {
            message: message.to_string(),
        });
    }
}

//! Popup session coordination
//!
//! One listener slot is shared by every session. Starting a session
//! deregisters whatever was live and claims the slot for the new token; the
//! window is registered only if no newer session claimed the slot while the
//! host was opening it. Only the most recently started session can ever
//! report back. A superseded session's callbacks are dropped without firing.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PopupConfig;
use crate::error::LinkError;
use crate::sync::lock;

use super::{HostMessage, PopupHost, PopupWindow, WindowFeatures};

/// Identifies one authorization session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a session ended without completing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupFailure {
    /// The host refused to open the window
    Blocked,
    /// No completion message arrived within the configured timeout
    TimedOut,
}

impl From<PopupFailure> for LinkError {
    fn from(failure: PopupFailure) -> Self {
        match failure {
            PopupFailure::Blocked => LinkError::PopupBlocked,
            PopupFailure::TimedOut => LinkError::PopupTimedOut,
        }
    }
}

/// Where the most recent session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupPhase {
    #[default]
    Idle,
    Opening,
    WaitingForMessage,
    Completed,
    Failed(PopupFailure),
}

/// Completion and failure hooks bound to one session. Each fires at most once.
pub struct SessionCallbacks {
    on_completed: Box<dyn FnOnce() + Send>,
    on_failed: Box<dyn FnOnce(PopupFailure) + Send>,
}

impl SessionCallbacks {
    pub fn new(
        on_completed: impl FnOnce() + Send + 'static,
        on_failed: impl FnOnce(PopupFailure) + Send + 'static,
    ) -> Self {
        Self {
            on_completed: Box::new(on_completed),
            on_failed: Box::new(on_failed),
        }
    }
}

struct LiveSession {
    token: SessionToken,
    callbacks: SessionCallbacks,
    window: Box<dyn PopupWindow>,
    started_at: DateTime<Utc>,
}

#[derive(Default)]
struct SessionSlot {
    live: Option<LiveSession>,
    /// Session whose window the host is opening right now
    opening: Option<SessionToken>,
    phase: PopupPhase,
}

/// Opens authorization popups and turns the popup's completion message into
/// a callback.
pub struct PopupAuthCoordinator {
    host: Arc<dyn PopupHost>,
    allowed_origin: Option<String>,
    orphan_timeout: Option<Duration>,
    slot: Arc<Mutex<SessionSlot>>,
}

impl PopupAuthCoordinator {
    /// Accepts completion messages from any origin and waits forever
    pub fn new(host: Arc<dyn PopupHost>) -> Self {
        Self {
            host,
            allowed_origin: None,
            orphan_timeout: None,
            slot: Arc::new(Mutex::new(SessionSlot::default())),
        }
    }

    pub fn with_config(host: Arc<dyn PopupHost>, config: &PopupConfig) -> Self {
        let mut coordinator = Self::new(host);
        coordinator.allowed_origin = config.allowed_origin.clone();
        coordinator.orphan_timeout = config.orphan_timeout();
        coordinator
    }

    /// Only accept completion messages posted from `origin`
    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origin = Some(origin.into());
        self
    }

    /// Fail sessions that are still waiting after `timeout`
    pub fn with_orphan_timeout(mut self, timeout: Duration) -> Self {
        self.orphan_timeout = Some(timeout);
        self
    }

    /// Open the authorization popup and make it the live session.
    ///
    /// If the host cannot open the window, `on_failed(Blocked)` runs before
    /// this returns and nothing is registered. A session started while this
    /// one's window is opening supersedes it.
    pub fn start_session(
        &self,
        authorization_url: &str,
        window_title: &str,
        callbacks: SessionCallbacks,
    ) -> SessionToken {
        let token = SessionToken::new();
        let features = WindowFeatures::centered(self.host.screen_width());

        {
            let mut slot = lock(&self.slot);
            if let Some(previous) = slot.live.take() {
                debug!(
                    session = %previous.token,
                    superseded_by = %token,
                    "Dropping listener of superseded authorization session"
                );
            }
            slot.opening = Some(token);
            slot.phase = PopupPhase::Opening;
        }

        // The host may call back into the coordinator, so no lock here
        let window = self
            .host
            .open_window(authorization_url, window_title, &features);
        if let Some(window) = &window {
            window.focus();
        }

        let blocked = {
            let mut slot = lock(&self.slot);
            if slot.opening != Some(token) {
                debug!(session = %token, "Authorization session superseded while opening");
                return token;
            }
            slot.opening = None;

            match window {
                Some(window) => {
                    slot.live = Some(LiveSession {
                        token,
                        callbacks,
                        window,
                        started_at: Utc::now(),
                    });
                    slot.phase = PopupPhase::WaitingForMessage;
                    None
                }
                None => {
                    slot.phase = PopupPhase::Failed(PopupFailure::Blocked);
                    Some(callbacks)
                }
            }
        };

        if let Some(callbacks) = blocked {
            warn!(session = %token, "Authorization popup was blocked");
            (callbacks.on_failed)(PopupFailure::Blocked);
            return token;
        }

        info!(session = %token, features = %features, "Authorization popup opened");
        self.schedule_expiry(token);
        token
    }

    /// Feed a cross-window message. Returns true if it completed the live
    /// session.
    pub fn receive_message(&self, message: &HostMessage) -> bool {
        if let Some(allowed) = &self.allowed_origin {
            if message.origin != *allowed {
                debug!(origin = %message.origin, "Ignoring message from unexpected origin");
                return false;
            }
        }
        if !message.is_completion() {
            return false;
        }

        let session = {
            let mut slot = lock(&self.slot);
            let session = slot.live.take();
            if session.is_some() {
                slot.phase = PopupPhase::Completed;
            }
            session
        };

        match session {
            Some(session) => {
                let elapsed = Utc::now() - session.started_at;
                info!(
                    session = %session.token,
                    elapsed_ms = elapsed.num_milliseconds(),
                    "Authorization completed"
                );
                (session.callbacks.on_completed)();
                true
            }
            None => {
                debug!("Completion message with no live session");
                false
            }
        }
    }

    pub fn phase(&self) -> PopupPhase {
        lock(&self.slot).phase
    }

    pub fn live_session(&self) -> Option<SessionToken> {
        lock(&self.slot).live.as_ref().map(|s| s.token)
    }

    /// Bring the live popup back to the foreground
    pub fn refocus(&self) -> bool {
        match &lock(&self.slot).live {
            Some(session) => {
                session.window.focus();
                true
            }
            None => false,
        }
    }

    fn schedule_expiry(&self, token: SessionToken) {
        let Some(timeout) = self.orphan_timeout else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(session = %token, "No tokio runtime; orphan timeout disabled for this session");
            return;
        };

        let deadline = tokio::time::Instant::now() + timeout;
        let slot = Arc::clone(&self.slot);
        runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            expire(&slot, token);
        });
    }
}

/// Fail `token` if it is still the live session
fn expire(slot: &Mutex<SessionSlot>, token: SessionToken) {
    let session = {
        let mut slot = lock(slot);
        let still_live = slot.live.as_ref().is_some_and(|live| live.token == token);
        if still_live {
            slot.phase = PopupPhase::Failed(PopupFailure::TimedOut);
            slot.live.take()
        } else {
            None
        }
    };

    if let Some(session) = session {
        warn!(session = %token, "Authorization popup never reported back");
        (session.callbacks.on_failed)(PopupFailure::TimedOut);
    }
}

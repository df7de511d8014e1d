//! Authorization popup handling
//!
//! The host environment (a browser shell, a webview, a desktop window
//! manager) is reached through `PopupHost`. Messages posted back from the
//! popup are fed to `PopupAuthCoordinator::receive_message`.

pub mod coordinator;

#[cfg(any(test, feature = "test-support"))]
pub mod mock_host;

use serde::{Deserialize, Serialize};

pub use coordinator::{PopupAuthCoordinator, PopupFailure, PopupPhase, SessionCallbacks, SessionToken};

#[cfg(any(test, feature = "test-support"))]
pub use mock_host::MockPopupHost;

pub const POPUP_WIDTH: u32 = 600;
pub const POPUP_HEIGHT: u32 = 700;
pub const POPUP_TOP: u32 = 100;

/// Placement and chrome of the authorization window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFeatures {
    pub width: u32,
    pub height: u32,
    pub top: u32,
    /// Negative when the screen is narrower than the popup
    pub left: i64,
}

impl WindowFeatures {
    /// Fixed-size popup centered horizontally on a screen of the given width
    pub fn centered(screen_width: u32) -> Self {
        let left = (i64::from(screen_width) - i64::from(POPUP_WIDTH)) / 2;
        Self {
            width: POPUP_WIDTH,
            height: POPUP_HEIGHT,
            top: POPUP_TOP,
            left,
        }
    }
}

impl std::fmt::Display for WindowFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "toolbar=no, menubar=no, width={}, height={}, top={}, left={}",
            self.width, self.height, self.top, self.left
        )
    }
}

/// A browsing context opened by the host
pub trait PopupWindow: Send {
    /// Bring the window to the foreground
    fn focus(&self);
}

/// The environment able to open popup windows
///
/// `open_window` runs without the coordinator's session lock held, so a host
/// may post messages back into the coordinator while the window opens.
pub trait PopupHost: Send + Sync {
    /// Width of the current screen in pixels
    fn screen_width(&self) -> u32;

    /// Open `url` in a new window. `None` means the host refused, usually
    /// because of popup blocking.
    fn open_window(
        &self,
        url: &str,
        name: &str,
        features: &WindowFeatures,
    ) -> Option<Box<dyn PopupWindow>>;
}

/// A message posted across the window boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    /// Origin of the sending window, e.g. `https://app.example.com`
    pub origin: String,
    pub data: serde_json::Value,
}

impl HostMessage {
    pub fn new(origin: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }

    /// `data` is an object whose `completed` field is boolean `true`
    pub fn is_completion(&self) -> bool {
        self.data
            .get("completed")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

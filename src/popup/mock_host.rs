//! Mock PopupHost for testing
//!
//! Records every window the coordinator asks for and can be switched into a
//! "popup blocked" mode.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::sync::lock;

use super::{PopupHost, PopupWindow, WindowFeatures};

/// A window open request seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedWindow {
    pub url: String,
    pub name: String,
    pub features: WindowFeatures,
}

struct MockWindow {
    focus_count: Arc<AtomicUsize>,
}

impl PopupWindow for MockWindow {
    fn focus(&self) {
        self.focus_count.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockPopupHost {
    screen_width: u32,
    blocked: AtomicBool,
    opened: Mutex<Vec<OpenedWindow>>,
    focus_count: Arc<AtomicUsize>,
}

impl MockPopupHost {
    pub fn new() -> Self {
        Self {
            screen_width: 1440,
            blocked: AtomicBool::new(false),
            opened: Mutex::new(Vec::new()),
            focus_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_screen_width(mut self, width: u32) -> Self {
        self.screen_width = width;
        self
    }

    /// Refuse every window, as a popup blocker would
    pub fn blocked(self) -> Self {
        self.set_blocked(true);
        self
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Every open request, including refused ones
    pub fn opened(&self) -> Vec<OpenedWindow> {
        lock(&self.opened).clone()
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count.load(Ordering::SeqCst)
    }
}

impl Default for MockPopupHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupHost for MockPopupHost {
    fn screen_width(&self) -> u32 {
        self.screen_width
    }

    fn open_window(
        &self,
        url: &str,
        name: &str,
        features: &WindowFeatures,
    ) -> Option<Box<dyn PopupWindow>> {
        lock(&self.opened).push(OpenedWindow {
            url: url.to_string(),
            name: name.to_string(),
            features: *features,
        });

        if self.blocked.load(Ordering::SeqCst) {
            return None;
        }
        Some(Box::new(MockWindow {
            focus_count: Arc::clone(&self.focus_count),
        }))
    }
}

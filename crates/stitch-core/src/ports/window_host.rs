//! Window host port.
//!
//! The host presents a single UI surface pointed at the backend address and
//! reports its close through a [`WindowHandle`]. Closing is an event the
//! coordinator subscribes to; the host never touches the backend itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::errors::WindowError;
use crate::settings::ShellSettings;

/// Label of the only window the shell presents.
pub const MAIN_WINDOW_LABEL: &str = "main";

/// What to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRequest {
    pub label: String,
    pub url: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub devtools: bool,
}

impl WindowRequest {
    /// Build the main window request from shell settings.
    pub fn from_settings(settings: &ShellSettings) -> Self {
        Self {
            label: MAIN_WINDOW_LABEL.to_string(),
            url: settings.address.clone(),
            title: settings.window.title.clone(),
            width: settings.window.width,
            height: settings.window.height,
            devtools: settings.window.devtools,
        }
    }
}

/// Why a window went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseReason {
    /// The user dismissed the window.
    User,
    /// The coordinator asked the host to close it.
    Requested,
    /// The host dropped the window without reporting a reason.
    HostGone,
}

/// Sending half of a window close notification, held by the host.
#[derive(Debug)]
pub struct WindowCloseNotifier {
    tx: oneshot::Sender<CloseReason>,
}

impl WindowCloseNotifier {
    /// Report the close. Consumes the notifier so it fires at most once.
    pub fn notify(self, reason: CloseReason) {
        let _ = self.tx.send(reason);
    }
}

/// Coordinator-owned handle to the presented window.
#[derive(Debug)]
pub struct WindowHandle {
    label: String,
    closed: Option<oneshot::Receiver<CloseReason>>,
}

impl WindowHandle {
    /// Create a handle and the notifier the host uses to report the close.
    pub fn channel(label: impl Into<String>) -> (WindowCloseNotifier, Self) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            label: label.into(),
            closed: Some(rx),
        };
        (WindowCloseNotifier { tx }, handle)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the close event.
    ///
    /// Resolves once; later calls return `HostGone` immediately. Cancel safe.
    pub async fn closed(&mut self) -> CloseReason {
        let Some(rx) = self.closed.as_mut() else {
            return CloseReason::HostGone;
        };
        let reason = rx.await.unwrap_or(CloseReason::HostGone);
        self.closed = None;
        reason
    }
}

/// Presents the UI surface bound to the backend address.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait WindowHost: Send + Sync {
    /// Present a window. Called at most once per coordinator run.
    async fn open(&self, request: WindowRequest) -> Result<WindowHandle, WindowError>;

    /// Dismiss the window with `label` if it is still open.
    async fn close(&self, label: &str) -> Result<(), WindowError>;
}

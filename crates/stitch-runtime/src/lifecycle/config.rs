//! Coordinator configuration resolved from shell settings.

use std::time::Duration;

use stitch_core::{LaunchSpec, ShellSettings, TerminationSignal, WindowRequest};

/// Everything the coordinator needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub launch: LaunchSpec,
    /// Base address that is probed and loaded in the window.
    pub address: String,
    pub window: WindowRequest,
    pub shutdown_signal: TerminationSignal,
    /// How long the backend gets to exit after the graceful signal before it
    /// is killed. Also bounds the wait for the kill to be confirmed.
    pub grace: Duration,
}

impl CoordinatorConfig {
    pub fn from_settings(settings: &ShellSettings) -> Self {
        Self {
            launch: settings.backend.clone(),
            address: settings.address.clone(),
            window: WindowRequest::from_settings(settings),
            shutdown_signal: settings.shutdown.signal,
            grace: settings.shutdown.grace(),
        }
    }

    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from_settings(&ShellSettings::default())
    }
}

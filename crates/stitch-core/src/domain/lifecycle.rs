//! Lifecycle state machines for the backend, the readiness poller and the
//! coordinator that binds them to the window.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single backend child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessState {
    /// No child has been spawned yet.
    #[default]
    NotStarted,
    /// The child is alive and no termination has been requested.
    Running,
    /// A termination request was delivered; waiting for the OS to report exit.
    Terminating,
    /// The OS confirmed the child is gone and its handle has been released.
    Exited,
}

impl ProcessState {
    /// Whether a live child may still exist in this state.
    #[must_use]
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Running | Self::Terminating)
    }
}

/// Lifecycle of a readiness poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PollerState {
    /// Created but not started (or reset).
    #[default]
    Idle,
    /// Probes are being issued.
    Polling,
    /// A probe succeeded; no further probes are issued until reset.
    Ready,
    /// Cancelled before any probe succeeded.
    Cancelled,
    /// The configured maximum wait elapsed before any probe succeeded.
    Expired,
}

impl PollerState {
    /// Whether the poller has stopped issuing probes.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Cancelled | Self::Expired)
    }
}

/// Overall phase of the lifecycle coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoordinatorPhase {
    #[default]
    Launching,
    WaitingForReady,
    WindowOpen,
    ShuttingDown,
    Stopped,
}

impl CoordinatorPhase {
    /// Whether `next` is a legal successor of this phase.
    ///
    /// `Launching -> Stopped` is only taken when the spawn fails; every other
    /// path to `Stopped` goes through `ShuttingDown`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Launching, Self::WaitingForReady | Self::Stopped)
                | (Self::WaitingForReady, Self::WindowOpen | Self::ShuttingDown)
                | (Self::WindowOpen, Self::ShuttingDown)
                | (Self::ShuttingDown, Self::Stopped)
        )
    }

    #[must_use]
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for CoordinatorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Launching => "launching",
            Self::WaitingForReady => "waiting-for-ready",
            Self::WindowOpen => "window-open",
            Self::ShuttingDown => "shutting-down",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

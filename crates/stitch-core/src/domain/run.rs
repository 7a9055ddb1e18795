//! Outcome of a supervised run.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::launch::ExitReport;

/// Why the coordinator entered `ShuttingDown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ShutdownCause {
    /// The window host reported the window closed.
    WindowClosed,
    /// The backend exited while it was expected to be running.
    BackendCrashed { exit: ExitReport },
    /// The shell asked the coordinator to stop.
    Cancelled,
    /// The readiness deadline elapsed before the backend answered.
    ReadinessExpired,
    /// The window host failed to present the window.
    WindowFailed { reason: String },
}

impl ShutdownCause {
    /// Whether this cause ends the run in an operator-visible failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::WindowClosed | Self::Cancelled)
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowClosed => f.write_str("window closed"),
            Self::BackendCrashed { exit } => write!(f, "backend crashed ({exit})"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::ReadinessExpired => f.write_str("backend never became ready"),
            Self::WindowFailed { reason } => write!(f, "window failed: {reason}"),
        }
    }
}

/// Summary of a coordinator run that reached `Stopped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub cause: ShutdownCause,
    /// Exit confirmed by the OS for the backend child.
    pub exit: ExitReport,
    /// Probes issued before the poller stopped.
    pub probe_attempts: u32,
    pub window_opened: bool,
    /// Whether graceful termination timed out and the child was killed.
    pub forced_kill: bool,
}

//! Lifecycle events for observers of a supervised run.
//!
//! Events are informational: the coordinator never waits on a consumer, and
//! dropping every event leaves the run unaffected.

use serde::{Deserialize, Serialize};

use crate::domain::{CoordinatorPhase, ExitReport, ShutdownCause};

/// Which backend pipe a line of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// The coordinator moved to a new phase.
    PhaseChanged {
        from: CoordinatorPhase,
        to: CoordinatorPhase,
    },

    /// The backend child was spawned.
    BackendStarted { pid: Option<u32> },

    /// A line the backend wrote to stdout or stderr.
    BackendOutput { stream: OutputStream, line: String },

    /// A readiness attempt failed; the poller will retry.
    ProbeFailed { attempt: u32, error: String },

    /// The first successful readiness probe.
    BackendReady { attempts: u32, address: String },

    /// The window host presented the window.
    WindowOpened { address: String },

    /// The window host reported the window closed.
    WindowClosed,

    /// The backend exited while it was expected to be running.
    BackendCrashed { exit: ExitReport },

    /// Graceful termination did not finish in time; the backend is being killed.
    TerminationTimeout { grace_ms: u64 },

    /// The run reached `Stopped`.
    Stopped {
        cause: ShutdownCause,
        exit: Option<ExitReport>,
    },
}

impl LifecycleEvent {
    pub const fn phase_changed(from: CoordinatorPhase, to: CoordinatorPhase) -> Self {
        Self::PhaseChanged { from, to }
    }

    pub fn output(stream: OutputStream, line: impl Into<String>) -> Self {
        Self::BackendOutput {
            stream,
            line: line.into(),
        }
    }

    /// Whether this event marks the end of a run.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

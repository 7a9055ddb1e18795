//! Error taxonomy for the supervised lifecycle.
//!
//! Only [`SpawnError`] and a crashed backend end a run in an operator-visible
//! failure. [`ProbeFailure`] never leaves the readiness poller, and a
//! termination timeout is reported as an event rather than an error.

use std::io;

use thiserror::Error;

use crate::domain::{CoordinatorPhase, ExitReport};
use crate::settings::SettingsError;

/// The backend process could not be started.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The executable was not found or the OS refused to create the process.
    #[error("Failed to launch backend '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A child is already live for this backend instance.
    #[error("Backend is already started (pid {pid:?})")]
    AlreadyStarted { pid: Option<u32> },
}

/// A single readiness attempt failed. Always recovered by retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// Nothing accepted the connection.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The attempt exceeded its per-attempt timeout.
    #[error("Probe timed out after {0}ms")]
    Timeout(u64),

    /// A response was received but rejected (only when status checking is on).
    #[error("Unexpected status {0}")]
    Status(u16),

    /// Any other transport or protocol error.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// The window host could not present or dismiss the window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("Failed to open window: {0}")]
    Open(String),

    #[error("Failed to close window: {0}")]
    Close(String),
}

/// Conditions that end a coordinator run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The backend could not be spawned; nothing else was started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The backend exited while it was expected to be running.
    #[error("Backend crashed: {exit}")]
    BackendCrashed { exit: ExitReport },

    /// The backend never answered a readiness probe before the deadline.
    #[error("Backend did not become ready within {waited_ms}ms")]
    ReadinessExpired { waited_ms: u64 },

    /// The window could not be presented.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Settings failed validation before anything was launched.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The backend's exit was never reported, so it may still be alive.
    #[error("Backend exit could not be confirmed")]
    ExitUnconfirmed,

    /// The readiness poller handed to the coordinator was still running.
    #[error("Readiness poller is already running")]
    PollerBusy,

    /// The state machine was asked to take an edge it does not have.
    #[error("Invalid phase transition {from} -> {to}")]
    InvalidTransition {
        from: CoordinatorPhase,
        to: CoordinatorPhase,
    },
}

impl LifecycleError {
    /// Process exit code for the shell binary.
    ///
    /// Codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::BackendCrashed { .. } => 1,
            // EX_SOFTWARE
            Self::InvalidTransition { .. } | Self::PollerBusy | Self::ExitUnconfirmed => 70,
            Self::Spawn(_) => 71, // EX_OSERR
            Self::ReadinessExpired { .. } | Self::Window(_) => 69, // EX_UNAVAILABLE
            Self::Settings(_) => 78, // EX_CONFIG
        }
    }
}

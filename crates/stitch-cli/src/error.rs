//! CLI error type and exit code mapping.

use stitch_core::{LifecycleError, SettingsError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The supervised run ended in a failure.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Settings could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] SettingsError),

    /// The readiness probe client could not be built.
    #[error("Failed to initialise readiness probe: {0}")]
    Probe(String),
}

impl CliError {
    /// Map error to a process exit code.
    ///
    /// Exit codes follow sysexits.h:
    /// - 1: backend crashed
    /// - 69: window or readiness unavailable (EX_UNAVAILABLE)
    /// - 70: internal error (EX_SOFTWARE)
    /// - 71: backend could not be spawned (EX_OSERR)
    /// - 78: invalid configuration (EX_CONFIG)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Lifecycle(err) => err.exit_code(),
            Self::Config(_) => 78,
            Self::Probe(_) => 70,
        }
    }
}

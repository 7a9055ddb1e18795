//! Backend process port.
//!
//! One implementation instance supervises at most one live child for its
//! whole lifetime. The child handle never leaves the implementation; callers
//! only request signals and observe the exit.

use tokio::sync::watch;

use crate::domain::{ExitReport, LaunchSpec, ProcessState, TerminationSignal};
use crate::errors::SpawnError;

/// Control surface of a supervised backend child process.
#[cfg_attr(feature = "test-utils", mockall::automock)]
pub trait BackendPort: Send + Sync {
    /// Spawn the child. Transitions `NotStarted -> Running`.
    ///
    /// Returns the OS process id when one is available.
    fn start(&mut self, spec: &LaunchSpec) -> Result<Option<u32>, SpawnError>;

    /// Request graceful termination. Transitions `Running -> Terminating`.
    ///
    /// No-op in any state other than `Running`, so repeated calls are harmless.
    fn terminate(&mut self, signal: TerminationSignal);

    /// Forcefully kill the child. No-op once the exit has been observed.
    fn kill(&mut self);

    /// Subscribe to the one-shot exit notification.
    fn subscribe_exit(&self) -> ExitSubscription;

    fn state(&self) -> ProcessState;
}

/// One-shot observer of a backend exit.
///
/// Resolves immediately when the exit was already observed, so a late
/// subscriber cannot miss it.
#[derive(Debug, Clone)]
pub struct ExitSubscription {
    rx: watch::Receiver<Option<ExitReport>>,
}

impl ExitSubscription {
    pub const fn new(rx: watch::Receiver<Option<ExitReport>>) -> Self {
        Self { rx }
    }

    /// Create a publisher/subscription pair.
    pub fn channel() -> (watch::Sender<Option<ExitReport>>, Self) {
        let (tx, rx) = watch::channel(None);
        (tx, Self::new(rx))
    }

    /// The exit, if it has already been observed.
    pub fn exited(&self) -> Option<ExitReport> {
        *self.rx.borrow()
    }

    /// Wait for the exit.
    ///
    /// Returns `None` only when the publisher went away without ever
    /// reporting an exit. Cancel safe.
    pub async fn wait(&mut self) -> Option<ExitReport> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(report) => *report,
            Err(_) => None,
        }
    }
}

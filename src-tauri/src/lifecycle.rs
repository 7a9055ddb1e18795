//! Shutdown coordination between the Tauri event loop and the coordinator.
//!
//! The event loop must not exit while the backend may still be alive, so an
//! exit request before the coordinator reached `Stopped` is deferred: the
//! coordinator is cancelled and the app exits once `run` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Slack on top of the shutdown grace periods before the watchdog fires.
const WATCHDOG_SLACK: Duration = Duration::from_secs(5);

/// State shared by the coordinator task and the event loop.
pub struct ShellState {
    cancel: CancellationToken,
    stopped: AtomicBool,
    watchdog_after: Duration,
}

impl ShellState {
    pub fn new(grace: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            stopped: AtomicBool::new(false),
            // Window close, terminate grace, then kill confirmation
            watchdog_after: grace * 3 + WATCHDOG_SLACK,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The coordinator has reached `Stopped`; exits may proceed.
    pub fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Cancel the coordinator and arm a watchdog that force-exits if the
    /// backend cannot be confirmed gone in time.
    pub fn request_shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!("Exit requested - shutting the backend down first");
        self.cancel.cancel();

        let deadline = self.watchdog_after;
        std::thread::spawn(move || {
            std::thread::sleep(deadline);
            warn!(deadline_ms = deadline.as_millis(), "Shutdown watchdog fired");
            eprintln!("SHUTDOWN WATCHDOG: backend shutdown exceeded {deadline:?} - forcing exit");
            std::process::exit(1);
        });
    }
}

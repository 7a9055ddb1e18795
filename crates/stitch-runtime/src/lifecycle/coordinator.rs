//! The supervising state machine.
//!
//! ```text
//! Launching --spawn ok--> WaitingForReady --ready--> WindowOpen
//!     |                        |                         |
//!  spawn err             crash/cancel/expiry      close/crash/cancel
//!     v                        v                         v
//!  Stopped <------------- ShuttingDown <-----------------+
//! ```
//!
//! Phase writes are funneled through [`LifecycleCoordinator::transition`];
//! everything else (poller, exit watcher, window host) reports back through
//! one-shot notifications that the coordinator selects over.

use std::sync::Arc;
use std::time::Duration;

use stitch_core::{
    BackendPort, CoordinatorPhase, ExitReport, ExitSubscription, LifecycleError, LifecycleEvent,
    LifecycleEventEmitter, RunSummary, ShutdownCause, WindowError, WindowHandle, WindowHost,
};
use tokio::sync::watch;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::CoordinatorConfig;
use crate::readiness::{PollerHandle, ReadinessPoller};

/// Drives one backend through launch, readiness, window and shutdown.
///
/// Owns its backend and poller exclusively. [`run`](Self::run) consumes the
/// coordinator, so each instance supervises exactly one run.
pub struct LifecycleCoordinator<B> {
    config: CoordinatorConfig,
    backend: B,
    poller: ReadinessPoller,
    window_host: Arc<dyn WindowHost>,
    emitter: Arc<dyn LifecycleEventEmitter>,
    cancel: CancellationToken,
    phase: watch::Sender<CoordinatorPhase>,
    window: Option<WindowHandle>,
    window_opened: bool,
    window_error: Option<WindowError>,
}

/// Shutdown bookkeeping carried into the summary.
struct Teardown {
    exit: ExitReport,
    forced_kill: bool,
    probe_attempts: u32,
}

impl<B: BackendPort> LifecycleCoordinator<B> {
    pub fn new(
        config: CoordinatorConfig,
        backend: B,
        poller: ReadinessPoller,
        window_host: Arc<dyn WindowHost>,
        emitter: Arc<dyn LifecycleEventEmitter>,
    ) -> Self {
        let (phase, _) = watch::channel(CoordinatorPhase::Launching);
        Self {
            config,
            backend,
            poller,
            window_host,
            emitter,
            cancel: CancellationToken::new(),
            phase,
            window: None,
            window_opened: false,
            window_error: None,
        }
    }

    /// Shut the run down when `token` is cancelled instead of an own token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that shuts the run down when cancelled (shell exit, Ctrl-C).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Observe phase changes.
    pub fn phase(&self) -> watch::Receiver<CoordinatorPhase> {
        self.phase.subscribe()
    }

    /// Run the lifecycle to `Stopped`.
    ///
    /// Returns the summary for a window close or cancellation. A crashed
    /// backend, a readiness deadline or a window failure is returned as the
    /// corresponding [`LifecycleError`] once the backend is confirmed gone.
    pub async fn run(mut self) -> Result<RunSummary, LifecycleError> {
        info!(command = %self.config.launch, address = %self.config.address, "Launching backend");

        let pid = match self.backend.start(&self.config.launch) {
            Ok(pid) => pid,
            Err(e) => {
                error!(error = %e, "Backend failed to start");
                self.transition(CoordinatorPhase::Stopped)?;
                return Err(e.into());
            }
        };
        self.emitter.emit(LifecycleEvent::BackendStarted { pid });
        let mut exit = self.backend.subscribe_exit();

        self.transition(CoordinatorPhase::WaitingForReady)?;
        self.poller.reset();
        let mut poll = match self.poller.start(self.config.address.clone(), self.cancel.clone()) {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Cannot start readiness polling");
                self.shutdown(ShutdownCause::Cancelled, &mut exit, None).await?;
                return Err(LifecycleError::PollerBusy);
            }
        };

        let waiting_since = Instant::now();
        let cause = match self.wait_for_ready(&mut exit, &mut poll).await {
            Ok(()) => self.present_window(&mut exit).await,
            Err(cause) => cause,
        };
        let waited = waiting_since.elapsed();

        let teardown = self.shutdown(cause.clone(), &mut exit, Some(poll)).await?;
        let summary = RunSummary {
            cause: cause.clone(),
            exit: teardown.exit,
            probe_attempts: teardown.probe_attempts,
            window_opened: self.window_opened,
            forced_kill: teardown.forced_kill,
        };

        match cause {
            ShutdownCause::BackendCrashed { exit } => Err(LifecycleError::BackendCrashed { exit }),
            ShutdownCause::ReadinessExpired => Err(LifecycleError::ReadinessExpired {
                waited_ms: millis(waited),
            }),
            ShutdownCause::WindowFailed { reason } => Err(LifecycleError::Window(
                self.window_error.take().unwrap_or(WindowError::Open(reason)),
            )),
            ShutdownCause::WindowClosed | ShutdownCause::Cancelled => {
                info!(cause = %summary.cause, exit = %summary.exit, "Shell stopped");
                Ok(summary)
            }
        }
    }

    /// Wait in `WaitingForReady` until the poller succeeds.
    ///
    /// `Err` carries the reason the run has to shut down instead.
    async fn wait_for_ready(
        &mut self,
        exit: &mut ExitSubscription,
        poll: &mut PollerHandle,
    ) -> Result<(), ShutdownCause> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ShutdownCause::Cancelled),
            report = exit.wait() => Err(crashed(report)),
            ready = poll.ready() => match ready {
                Some(event) => {
                    self.emitter.emit(LifecycleEvent::BackendReady {
                        attempts: event.attempts,
                        address: event.address,
                    });
                    Ok(())
                }
                None if self.cancel.is_cancelled() => Err(ShutdownCause::Cancelled),
                None => Err(ShutdownCause::ReadinessExpired),
            },
        }
    }

    /// Open the window and wait for it to close.
    async fn present_window(&mut self, exit: &mut ExitSubscription) -> ShutdownCause {
        let host = self.window_host.clone();
        let request = self.config.window.clone();

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return ShutdownCause::Cancelled,
            report = exit.wait() => return crashed(report),
            opened = host.open(request) => opened,
        };

        let handle = match opened {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Window host failed to present the window");
                let reason = e.to_string();
                self.window_error = Some(e);
                return ShutdownCause::WindowFailed { reason };
            }
        };
        self.window = Some(handle);
        self.window_opened = true;
        if let Err(cause) = self.transition(CoordinatorPhase::WindowOpen) {
            error!(error = %cause, "Phase table rejected WindowOpen");
            return ShutdownCause::Cancelled;
        }
        self.emitter.emit(LifecycleEvent::WindowOpened {
            address: self.config.address.clone(),
        });

        let Some(window) = self.window.as_mut() else {
            return ShutdownCause::Cancelled;
        };
        // A close that races shell cancellation is still reported as the close
        tokio::select! {
            biased;
            reason = window.closed() => {
                debug!(?reason, "Window closed");
                self.window = None;
                self.emitter.emit(LifecycleEvent::WindowClosed);
                ShutdownCause::WindowClosed
            }
            () = self.cancel.cancelled() => ShutdownCause::Cancelled,
            report = exit.wait() => crashed(report),
        }
    }

    /// Quiesce the poller and the backend, then enter `Stopped`.
    ///
    /// Terminate is requested exactly once, before the window is dismissed.
    /// After `grace` the backend is killed and the run waits for the OS to
    /// confirm the exit. If the exit can never be observed the run ends in
    /// [`LifecycleError::ExitUnconfirmed`] without reaching `Stopped`.
    async fn shutdown(
        &mut self,
        cause: ShutdownCause,
        exit: &mut ExitSubscription,
        poll: Option<PollerHandle>,
    ) -> Result<Teardown, LifecycleError> {
        self.transition(CoordinatorPhase::ShuttingDown)?;
        info!(%cause, "Shutting down");

        if let ShutdownCause::BackendCrashed { exit } = &cause {
            error!(exit = %exit, "Backend exited unexpectedly");
            self.emitter.emit(LifecycleEvent::BackendCrashed { exit: *exit });
        }

        if let Some(poll) = &poll {
            poll.stop();
        }

        self.backend.terminate(self.config.shutdown_signal);

        let grace = self.config.grace;
        if let Some(window) = self.window.take() {
            match timeout(grace, self.window_host.close(window.label())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Failed to close window"),
                Err(_) => warn!(grace_ms = millis(grace), "Window host did not close the window"),
            }
        }

        let mut forced_kill = false;
        let report = match timeout(grace, exit.wait()).await {
            Ok(report) => report,
            Err(_) => {
                warn!(
                    grace_ms = millis(grace),
                    "Backend ignored graceful shutdown, killing"
                );
                self.emitter.emit(LifecycleEvent::TerminationTimeout {
                    grace_ms: millis(grace),
                });
                forced_kill = true;
                self.backend.kill();
                exit.wait().await
            }
        };
        let Some(exit_report) = report else {
            error!("Backend exit was not confirmed");
            return Err(LifecycleError::ExitUnconfirmed);
        };

        let probe_attempts = match poll {
            Some(poll) => poll.join().await.attempts(),
            None => 0,
        };

        self.transition(CoordinatorPhase::Stopped)?;
        self.emitter.emit(LifecycleEvent::Stopped {
            cause,
            exit: Some(exit_report),
        });

        Ok(Teardown {
            exit: exit_report,
            forced_kill,
            probe_attempts,
        })
    }

    fn transition(&self, to: CoordinatorPhase) -> Result<(), LifecycleError> {
        let from = *self.phase.borrow();
        if !from.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }
        self.phase.send_replace(to);
        debug!(%from, %to, "Phase changed");
        self.emitter.emit(LifecycleEvent::phase_changed(from, to));
        Ok(())
    }
}

fn crashed(report: Option<ExitReport>) -> ShutdownCause {
    ShutdownCause::BackendCrashed {
        exit: report.unwrap_or_default(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

//! Readiness polling loop.
//!
//! A poller probes one target address until the first success, a
//! cancellation or the optional deadline. Probe failures are expected while
//! the backend boots and never leave the loop except as debug traces and
//! `ProbeFailed` events.

use std::sync::Arc;
use std::time::Duration;

use stitch_core::{
    LifecycleEvent, LifecycleEventEmitter, NoopEmitter, PollerState, ProbeFailure, ReadinessProbe,
};
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::ReadinessPolicy;

/// First successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyEvent {
    pub address: String,
    /// Number of probes issued, including the successful one.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// How a polling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { attempts: u32 },
    Cancelled { attempts: u32 },
    Expired { attempts: u32 },
}

impl PollOutcome {
    pub const fn attempts(self) -> u32 {
        match self {
            Self::Ready { attempts } | Self::Cancelled { attempts } | Self::Expired { attempts } => {
                attempts
            }
        }
    }

    pub const fn state(self) -> PollerState {
        match self {
            Self::Ready { .. } => PollerState::Ready,
            Self::Cancelled { .. } => PollerState::Cancelled,
            Self::Expired { .. } => PollerState::Expired,
        }
    }
}

/// `start` was called while the poller was not `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Readiness poller cannot start from state {0:?}; reset it first")]
pub struct PollerBusy(pub PollerState);

/// Probes a backend address until it answers.
pub struct ReadinessPoller {
    probe: Arc<dyn ReadinessProbe>,
    policy: ReadinessPolicy,
    emitter: Arc<dyn LifecycleEventEmitter>,
    state: Arc<watch::Sender<PollerState>>,
}

impl ReadinessPoller {
    pub fn new(probe: Arc<dyn ReadinessProbe>, policy: ReadinessPolicy) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            probe,
            policy,
            emitter: Arc::new(NoopEmitter::new()),
            state: Arc::new(state),
        }
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn LifecycleEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub const fn policy(&self) -> &ReadinessPolicy {
        &self.policy
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    /// Start probing `target`.
    ///
    /// The loop stops at the first success, when `cancel` (or the handle's
    /// [`PollerHandle::stop`]) fires, or when `max_wait` elapses.
    pub fn start(
        &self,
        target: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<PollerHandle, PollerBusy> {
        let current = self.state();
        if current != PollerState::Idle {
            return Err(PollerBusy(current));
        }
        self.state.send_replace(PollerState::Polling);

        let target = target.into();
        let cancel = cancel.child_token();
        let (ready_tx, ready_rx) = oneshot::channel();

        debug!(%target, interval_ms = self.policy.interval.as_millis(), "Readiness polling started");

        let task = tokio::spawn(poll_loop(PollLoop {
            probe: self.probe.clone(),
            policy: self.policy,
            emitter: self.emitter.clone(),
            state: self.state.clone(),
            target,
            cancel: cancel.clone(),
            ready_tx,
        }));

        Ok(PollerHandle {
            ready: Some(ready_rx),
            cancel,
            task: Some(task),
        })
    }

    /// Return a finished poller to `Idle` so it can be started again.
    ///
    /// Returns `false` while a loop is still running.
    pub fn reset(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                *state = PollerState::Idle;
                true
            } else {
                false
            }
        });
        self.state() == PollerState::Idle
    }
}

/// Handle to a running polling loop.
#[derive(Debug)]
pub struct PollerHandle {
    ready: Option<oneshot::Receiver<ReadyEvent>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollerHandle {
    /// Wait for the ready notification.
    ///
    /// Resolves `Some` at most once, and `None` if the loop ended without a
    /// success or the notification was already taken. Cancel safe.
    pub async fn ready(&mut self) -> Option<ReadyEvent> {
        let rx = self.ready.as_mut()?;
        let event = rx.await.ok();
        self.ready = None;
        event
    }

    /// Cancel the loop. No probe is issued after this returns, apart from
    /// one already in flight.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the loop to quiesce.
    pub async fn join(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled { attempts: 0 };
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Readiness poller task failed");
                PollOutcome::Cancelled { attempts: 0 }
            }
        }
    }
}

struct PollLoop {
    probe: Arc<dyn ReadinessProbe>,
    policy: ReadinessPolicy,
    emitter: Arc<dyn LifecycleEventEmitter>,
    state: Arc<watch::Sender<PollerState>>,
    target: String,
    cancel: CancellationToken,
    ready_tx: oneshot::Sender<ReadyEvent>,
}

async fn poll_loop(ctx: PollLoop) -> PollOutcome {
    let PollLoop {
        probe,
        policy,
        emitter,
        state,
        target,
        cancel,
        ready_tx,
    } = ctx;

    let started = Instant::now();
    let deadline = policy.max_wait.map(|wait| started + wait);
    let mut attempts: u32 = 0;

    let outcome = loop {
        if cancel.is_cancelled() {
            break PollOutcome::Cancelled { attempts };
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break PollOutcome::Expired { attempts };
        }

        attempts = attempts.saturating_add(1);
        let result = match timeout(policy.probe_timeout, probe.probe(&target)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeFailure::Timeout(
                u64::try_from(policy.probe_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };

        match result {
            // A success that lands after cancellation is discarded
            Ok(()) if cancel.is_cancelled() => break PollOutcome::Cancelled { attempts },
            Ok(()) => {
                let event = ReadyEvent {
                    address: target.clone(),
                    attempts,
                    elapsed: started.elapsed(),
                };
                info!(%target, attempts, elapsed_ms = event.elapsed.as_millis(), "Backend is ready");
                state.send_replace(PollerState::Ready);
                let _ = ready_tx.send(event);
                return PollOutcome::Ready { attempts };
            }
            Err(failure) => {
                debug!(%target, attempt = attempts, error = %failure, "Readiness probe failed");
                emitter.emit(LifecycleEvent::ProbeFailed {
                    attempt: attempts,
                    error: failure.to_string(),
                });
            }
        }

        let mut wake = Instant::now() + policy.delay_for(attempts - 1);
        if let Some(deadline) = deadline {
            wake = wake.min(deadline);
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break PollOutcome::Cancelled { attempts },
            () = sleep_until(wake) => {}
        }
    };

    match outcome {
        PollOutcome::Expired { .. } => {
            warn!(%target, attempts, "Backend did not become ready before the deadline");
        }
        _ => debug!(%target, attempts, "Readiness polling cancelled"),
    }
    state.send_replace(outcome.state());
    outcome
}

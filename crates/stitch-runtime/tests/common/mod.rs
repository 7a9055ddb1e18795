//! Fakes shared by the lifecycle integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stitch_core::{
    BackendPort, CloseReason, ExitReport, ExitSubscription, LaunchSpec, LifecycleEvent,
    LifecycleEventEmitter, ProbeFailure, ProcessState, ReadinessProbe, SpawnError,
    TerminationSignal, WindowCloseNotifier, WindowError, WindowHandle, WindowHost, WindowRequest,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub const SIGINT: i32 = 2;
pub const SIGKILL: i32 = 9;

/// Calls observed by a [`FakeBackend`].
#[derive(Debug, Default)]
pub struct BackendCalls {
    pub starts: AtomicU32,
    pub terminates: AtomicU32,
    pub kills: AtomicU32,
}

impl BackendCalls {
    pub fn terminates(&self) -> u32 {
        self.terminates.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> u32 {
        self.kills.load(Ordering::SeqCst)
    }
}

/// In-memory backend whose exit is driven by the test.
pub struct FakeBackend {
    state: ProcessState,
    exit: Arc<watch::Sender<Option<ExitReport>>>,
    calls: Arc<BackendCalls>,
    honors_interrupt: bool,
    honors_kill: bool,
    spawn_fails: bool,
}

/// Test-side control over a [`FakeBackend`].
#[derive(Clone)]
pub struct BackendControl {
    exit: Arc<watch::Sender<Option<ExitReport>>>,
    pub calls: Arc<BackendCalls>,
}

impl BackendControl {
    /// Make the backend exit on its own.
    pub fn crash(&self, code: i32) {
        self.exit.send_replace(Some(ExitReport {
            code: Some(code),
            signal: None,
            requested: false,
        }));
    }

    /// Report a requested exit the backend did not report on its own.
    pub fn confirm_exit(&self, signal: i32) {
        self.exit.send_replace(Some(ExitReport {
            code: None,
            signal: Some(signal),
            requested: true,
        }));
    }
}

impl FakeBackend {
    pub fn new() -> (Self, BackendControl) {
        let (exit, _) = watch::channel(None);
        let exit = Arc::new(exit);
        let calls = Arc::new(BackendCalls::default());
        let backend = Self {
            state: ProcessState::NotStarted,
            exit: exit.clone(),
            calls: calls.clone(),
            honors_interrupt: true,
            honors_kill: true,
            spawn_fails: false,
        };
        (backend, BackendControl { exit, calls })
    }

    /// A backend that keeps running after the graceful signal.
    pub fn ignoring_interrupt() -> (Self, BackendControl) {
        let (mut backend, control) = Self::new();
        backend.honors_interrupt = false;
        (backend, control)
    }

    /// A backend whose exit is never reported, whatever it is sent.
    pub fn unkillable() -> (Self, BackendControl) {
        let (mut backend, control) = Self::new();
        backend.honors_interrupt = false;
        backend.honors_kill = false;
        (backend, control)
    }

    pub fn failing_spawn() -> (Self, BackendControl) {
        let (mut backend, control) = Self::new();
        backend.spawn_fails = true;
        (backend, control)
    }

    fn exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    fn finish(&self, signal: i32) {
        self.exit.send_replace(Some(ExitReport {
            code: None,
            signal: Some(signal),
            requested: true,
        }));
    }
}

impl BackendPort for FakeBackend {
    fn start(&mut self, spec: &LaunchSpec) -> Result<Option<u32>, SpawnError> {
        self.calls.starts.fetch_add(1, Ordering::SeqCst);
        if self.spawn_fails {
            return Err(SpawnError::Launch {
                program: spec.program.clone(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        self.state = ProcessState::Running;
        Ok(Some(4242))
    }

    fn terminate(&mut self, _signal: TerminationSignal) {
        self.calls.terminates.fetch_add(1, Ordering::SeqCst);
        if self.state() != ProcessState::Running {
            return;
        }
        self.state = ProcessState::Terminating;
        if self.honors_interrupt {
            self.finish(SIGINT);
        }
    }

    fn kill(&mut self) {
        self.calls.kills.fetch_add(1, Ordering::SeqCst);
        if self.honors_kill && self.state().is_alive() {
            self.finish(SIGKILL);
        }
    }

    fn subscribe_exit(&self) -> ExitSubscription {
        ExitSubscription::new(self.exit.subscribe())
    }

    fn state(&self) -> ProcessState {
        if self.exited() {
            ProcessState::Exited
        } else {
            self.state
        }
    }
}

/// Probe that fails until a given attempt, optionally cancelling a token.
pub struct ScriptedProbe {
    calls: AtomicU32,
    ready_on: Option<u32>,
    cancel_on: Option<(u32, CancellationToken)>,
}

impl ScriptedProbe {
    pub fn ready_on(attempt: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            ready_on: Some(attempt),
            cancel_on: None,
        }
    }

    pub fn never_ready() -> Self {
        Self {
            calls: AtomicU32::new(0),
            ready_on: None,
            cancel_on: None,
        }
    }

    /// Cancel `token` while answering attempt `attempt`.
    pub fn cancelling(mut self, attempt: u32, token: CancellationToken) -> Self {
        self.cancel_on = Some((attempt, token));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadinessProbe for ScriptedProbe {
    async fn probe(&self, _address: &str) -> Result<(), ProbeFailure> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on {
            if *at == attempt {
                token.cancel();
            }
        }
        match self.ready_on {
            Some(n) if attempt >= n => Ok(()),
            _ => Err(ProbeFailure::Connect("connection refused".to_string())),
        }
    }
}

/// Window host that records requests and lets the test close the window.
#[derive(Default)]
pub struct FakeWindowHost {
    pub opened: Mutex<Vec<WindowRequest>>,
    pub closed: Mutex<Vec<String>>,
    notifier: Mutex<Option<WindowCloseNotifier>>,
    fail_open: bool,
    hang_close: bool,
}

impl FakeWindowHost {
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// A host whose `close` never completes.
    pub fn hanging_close() -> Self {
        Self {
            hang_close: true,
            ..Self::default()
        }
    }

    /// Simulate the user dismissing the window.
    pub fn close_by_user(&self) {
        if let Some(notifier) = self.notifier.lock().unwrap().take() {
            notifier.notify(CloseReason::User);
        }
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn close_calls(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl WindowHost for FakeWindowHost {
    async fn open(&self, request: WindowRequest) -> Result<WindowHandle, WindowError> {
        if self.fail_open {
            return Err(WindowError::Open("no display".to_string()));
        }
        let (notifier, handle) = WindowHandle::channel(request.label.clone());
        self.opened.lock().unwrap().push(request);
        *self.notifier.lock().unwrap() = Some(notifier);
        Ok(handle)
    }

    async fn close(&self, label: &str) -> Result<(), WindowError> {
        self.closed.lock().unwrap().push(label.to_string());
        if self.hang_close {
            std::future::pending::<()>().await;
        }
        if let Some(notifier) = self.notifier.lock().unwrap().take() {
            notifier.notify(CloseReason::Requested);
        }
        Ok(())
    }
}

/// Emitter that keeps every event.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&LifecycleEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl LifecycleEventEmitter for RecordingEmitter {
    fn emit(&self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

//! Backend child process supervision.
//!
//! The spawned `Child` is moved into a single supervisor task and never
//! leaves it. `BackendProcess` talks to that task over a control channel and
//! observes state and exit through watch channels, so the handle has exactly
//! one owner and the exit is published exactly once.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use stitch_core::{
    BackendPort, ExitReport, ExitSubscription, LaunchSpec, LifecycleEventEmitter, NoopEmitter,
    OutputStream, ProcessState, SpawnError, TerminationSignal,
};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::signal::send_graceful;
use super::stream::spawn_stream_reader;

/// Requests from `BackendProcess` to its supervisor task.
#[derive(Debug, Clone, Copy)]
enum Control {
    Signal(TerminationSignal),
    Kill,
}

/// A supervised backend service process.
///
/// At most one child is ever spawned per instance. Dropping the instance
/// kills a child that is still alive.
pub struct BackendProcess {
    state: Arc<watch::Sender<ProcessState>>,
    exit_tx: Option<watch::Sender<Option<ExitReport>>>,
    exit_rx: watch::Receiver<Option<ExitReport>>,
    control: Option<mpsc::UnboundedSender<Control>>,
    pid: Option<u32>,
    emitter: Arc<dyn LifecycleEventEmitter>,
    supervisor: Option<JoinHandle<()>>,
}

impl BackendProcess {
    /// Create a backend whose output is only logged.
    pub fn new() -> Self {
        Self::with_emitter(Arc::new(NoopEmitter::new()))
    }

    /// Create a backend that also forwards its output lines as events.
    pub fn with_emitter(emitter: Arc<dyn LifecycleEventEmitter>) -> Self {
        let (state, _) = watch::channel(ProcessState::NotStarted);
        let (exit_tx, exit_rx) = watch::channel(None);
        Self {
            state: Arc::new(state),
            exit_tx: Some(exit_tx),
            exit_rx,
            control: None,
            pid: None,
            emitter,
            supervisor: None,
        }
    }

    /// OS process id of the child, once started.
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ProcessState> {
        self.state.subscribe()
    }

    /// Invoke `callback` once with the exit report, whether the exit was
    /// requested or spontaneous.
    pub fn on_exit<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(ExitReport) + Send + 'static,
    {
        let mut exit = self.subscribe_exit();
        tokio::spawn(async move {
            if let Some(report) = exit.wait().await {
                callback(report);
            }
        })
    }

    /// Wait until the supervisor task has published the exit and released
    /// the child handle.
    pub async fn wait(&mut self) -> Option<ExitReport> {
        let report = self.subscribe_exit().wait().await;
        if let Some(supervisor) = self.supervisor.take() {
            if let Err(e) = supervisor.await {
                warn!(error = %e, "Backend supervisor task failed");
            }
        }
        report
    }

    fn build_command(spec: &LaunchSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn send(&self, control: Control) {
        if let Some(tx) = &self.control {
            if tx.send(control).is_err() {
                debug!(pid = ?self.pid, ?control, "Backend supervisor already finished");
            }
        }
    }

    /// Move `Running -> Terminating` unless the exit was already observed.
    fn mark_terminating(&self) {
        self.state.send_if_modified(|state| {
            if *state == ProcessState::Running {
                *state = ProcessState::Terminating;
                true
            } else {
                false
            }
        });
    }
}

impl Default for BackendProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendPort for BackendProcess {
    fn start(&mut self, spec: &LaunchSpec) -> Result<Option<u32>, SpawnError> {
        if *self.state.borrow() != ProcessState::NotStarted {
            return Err(SpawnError::AlreadyStarted { pid: self.pid });
        }
        let Some(exit_tx) = self.exit_tx.take() else {
            return Err(SpawnError::AlreadyStarted { pid: self.pid });
        };

        let mut child = Self::build_command(spec).spawn().map_err(|source| {
            SpawnError::Launch {
                program: spec.program.clone(),
                source,
            }
        })?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, OutputStream::Stdout, pid, self.emitter.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, OutputStream::Stderr, pid, self.emitter.clone());
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        self.state.send_replace(ProcessState::Running);
        self.supervisor = Some(tokio::spawn(supervise(
            child,
            control_rx,
            self.state.clone(),
            exit_tx,
            pid,
        )));
        self.control = Some(control_tx);
        self.pid = pid;

        info!(pid = ?pid, command = %spec, "Backend process started");
        Ok(pid)
    }

    fn terminate(&mut self, signal: TerminationSignal) {
        if *self.state.borrow() != ProcessState::Running {
            debug!(pid = ?self.pid, state = ?*self.state.borrow(), "Terminate ignored");
            return;
        }
        info!(pid = ?self.pid, %signal, "Requesting backend shutdown");
        self.send(Control::Signal(signal));
        self.mark_terminating();
    }

    fn kill(&mut self) {
        if !self.state.borrow().is_alive() {
            return;
        }
        warn!(pid = ?self.pid, "Killing backend process");
        self.send(Control::Kill);
        self.mark_terminating();
    }

    fn subscribe_exit(&self) -> ExitSubscription {
        ExitSubscription::new(self.exit_rx.clone())
    }

    fn state(&self) -> ProcessState {
        *self.state.borrow()
    }
}

/// Own the child until the OS reports its exit, applying control requests.
async fn supervise(
    mut child: Child,
    mut control: mpsc::UnboundedReceiver<Control>,
    state: Arc<watch::Sender<ProcessState>>,
    exit_tx: watch::Sender<Option<ExitReport>>,
    pid: Option<u32>,
) {
    let mut requested = false;
    let mut control_open = true;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            request = control.recv(), if control_open => match request {
                Some(Control::Signal(signal)) => {
                    requested = true;
                    match send_graceful(&mut child, signal) {
                        Ok(delivery) => debug!(pid = ?pid, %signal, ?delivery, "Signal delivered"),
                        Err(e) => warn!(pid = ?pid, %signal, error = %e, "Failed to signal backend"),
                    }
                }
                Some(Control::Kill) => {
                    requested = true;
                    if let Err(e) = child.start_kill() {
                        warn!(pid = ?pid, error = %e, "Failed to kill backend");
                    }
                }
                None => {
                    // Owner dropped; take the child down with it
                    control_open = false;
                    requested = true;
                    let _ = child.start_kill();
                }
            }
        }
    };

    let report = match status {
        Ok(status) => exit_report(status, requested),
        Err(e) => {
            warn!(pid = ?pid, error = %e, "Failed to observe backend exit status");
            ExitReport {
                code: None,
                signal: None,
                requested,
            }
        }
    };

    if requested {
        info!(pid = ?pid, exit = %report, "Backend process exited");
    } else {
        warn!(pid = ?pid, exit = %report, "Backend process exited unexpectedly");
    }

    state.send_replace(ProcessState::Exited);
    exit_tx.send_replace(Some(report));
}

fn exit_report(status: ExitStatus, requested: bool) -> ExitReport {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    ExitReport {
        code: status.code(),
        signal,
        requested,
    }
}

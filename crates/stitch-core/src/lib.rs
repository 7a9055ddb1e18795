//! Core domain types and ports for the stitch-flex desktop shell.
//!
//! The shell launches a local backend service, waits for it to answer on its
//! address, presents a window bound to that address and tears the backend
//! down when the window closes. This crate holds the vocabulary for that
//! lifecycle: state enums, settings, events, errors and the ports that the
//! runtime and UI adapters implement. It performs no I/O beyond reading and
//! writing the settings file.

pub mod domain;
pub mod errors;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    CoordinatorPhase, ExitReport, LaunchSpec, PollerState, ProcessState, RunSummary,
    ShutdownCause, TerminationSignal,
};
pub use errors::{LifecycleError, ProbeFailure, SpawnError, WindowError};
pub use events::{LifecycleEvent, OutputStream};
pub use ports::{
    BackendPort, CloseReason, ExitSubscription, LifecycleEventEmitter, NoopEmitter,
    ReadinessProbe, WindowCloseNotifier, WindowHandle, WindowHost, WindowRequest,
};
pub use settings::{
    BackoffSettings, CrashReporterSettings, ReadinessSettings, SettingsError, ShellSettings,
    ShutdownSettings, WindowSettings, validate_settings,
};

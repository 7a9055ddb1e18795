//! Domain types for the supervised backend lifecycle.
//!
//! Pure data: no process handles, sockets or windows live here.

mod launch;
mod lifecycle;
mod run;

pub use launch::{
    DEFAULT_BACKEND_PROGRAM, DEFAULT_BACKEND_SCRIPT, ExitReport, LaunchSpec, TerminationSignal,
};
pub use lifecycle::{CoordinatorPhase, PollerState, ProcessState};
pub use run::{RunSummary, ShutdownCause};

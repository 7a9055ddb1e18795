//! OS-facing runtime for the stitch-flex shell.
//!
//! Implements the ports from `stitch-core`: the backend child process, the
//! HTTP readiness probe and poller, and the coordinator that ties the backend
//! to a window host.

#![deny(unsafe_code)]

mod crash;
mod emitter;
pub mod lifecycle;
pub mod process;
pub mod readiness;

pub use crash::{CrashReport, install_crash_hook};
pub use emitter::EventBroadcaster;
pub use lifecycle::{CoordinatorConfig, LifecycleCoordinator};
pub use process::BackendProcess;
pub use readiness::{
    HttpReadinessProbe, PollOutcome, PollerHandle, ReadinessPoller, ReadinessPolicy, ReadyEvent,
};

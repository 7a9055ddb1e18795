//! Backend process supervision.
//!
//! - `BackendProcess` - spawns the backend and owns its child handle
//! - signal delivery (SIGINT/SIGTERM via nix, kill elsewhere)
//! - stdout/stderr streaming into tracing and lifecycle events

mod backend;
mod signal;
mod stream;

pub use backend::BackendProcess;

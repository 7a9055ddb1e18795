//! Terminal front end for the stitch-flex shell.
//!
//! Parses flags, resolves settings and drives a `LifecycleCoordinator` whose
//! window is the terminal (and optionally the system browser).

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by the binary only
use anyhow as _;
use dotenvy as _;
use tokio_util as _;

pub mod bootstrap;
pub mod error;
pub mod parser;
pub mod window_host;

pub use bootstrap::{apply_overrides, build_coordinator, init_tracing, resolve_settings};
pub use error::CliError;
pub use parser::Cli;
pub use window_host::TerminalWindowHost;

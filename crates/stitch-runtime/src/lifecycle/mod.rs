//! Readiness-gated window lifecycle.

mod config;
mod coordinator;

pub use config::CoordinatorConfig;
pub use coordinator::LifecycleCoordinator;

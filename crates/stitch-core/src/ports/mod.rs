//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the lifecycle coordinator expects from the
//! operating system, the network and the UI toolkit. They contain no
//! implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `tokio::process`, `reqwest` or toolkit types in any signature
//! - Notifications are subscriptions the caller awaits, never callbacks
//!   invoked inline from inside an adapter

pub mod backend;
pub mod event_emitter;
pub mod readiness_probe;
pub mod window_host;

pub use backend::{BackendPort, ExitSubscription};
pub use event_emitter::{LifecycleEventEmitter, NoopEmitter};
pub use readiness_probe::ReadinessProbe;
pub use window_host::{CloseReason, WindowCloseNotifier, WindowHandle, WindowHost, WindowRequest};

#[cfg(feature = "test-utils")]
pub use backend::MockBackendPort;
#[cfg(feature = "test-utils")]
pub use readiness_probe::MockReadinessProbe;
#[cfg(feature = "test-utils")]
pub use window_host::MockWindowHost;

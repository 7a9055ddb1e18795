//! Event emitter trait for lifecycle observers.
//!
//! Implementations handle transport details (broadcast channels, Tauri
//! events, log lines).

use crate::events::LifecycleEvent;

/// Trait for emitting lifecycle events.
///
/// This method should not block; the coordinator calls it inline.
pub trait LifecycleEventEmitter: Send + Sync {
    fn emit(&self, event: LifecycleEvent);
}

/// A no-op event emitter for tests and headless contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleEventEmitter for NoopEmitter {
    fn emit(&self, _event: LifecycleEvent) {}
}

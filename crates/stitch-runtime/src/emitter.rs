//! Lifecycle event broadcasting.
//!
//! Fans coordinator events out to any number of observers (desktop bridge,
//! tests). Slow observers lag and lose events; the coordinator never waits.

use stitch_core::{LifecycleEvent, LifecycleEventEmitter};
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast channel capacity for lifecycle events
const CHANNEL_CAPACITY: usize = 256;

/// Broadcaster for lifecycle events
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleEventEmitter for EventBroadcaster {
    fn emit(&self, event: LifecycleEvent) {
        // Nobody listening is the common case for the CLI
        if self.sender.receiver_count() > 0 {
            trace!(?event, "Broadcasting lifecycle event");
            let _ = self.sender.send(event);
        }
    }
}

//! Streaming event channel.
//!
//! A broadcast sender the loop emits into synchronously; consumers
//! (terminal renderer, SSE pump) subscribe. Emission never blocks: with no
//! subscribers events are dropped, and a lagging subscriber loses old
//! events rather than stalling the producer.

use tokio::sync::broadcast;

use llagent_core::AgentEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Per-loop event emitter.
#[derive(Debug)]
pub struct EventEmitter {
    tx: broadcast::Sender<AgentEvent>,
}

impl EventEmitter {
    /// Create an emitter with the default buffer.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Emit one event to all current subscribers.
    pub fn emit(&self, event: AgentEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to events from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

//! Tunnel event broadcasting over a tokio broadcast channel.
//!
//! The host constructs one broadcaster, hands a clone to the registry as its
//! emitter, and subscribes wherever it needs events.

use tokio::sync::broadcast;
use tracing::debug;
use tunnelkit_core::{TunnelEvent, TunnelEventEmitter};

/// Broadcast channel capacity for tunnel events
const CHANNEL_CAPACITY: usize = 64;

/// Broadcaster for tunnel lifecycle events.
///
/// Clones share the same channel.
#[derive(Debug, Clone)]
pub struct TunnelEventBroadcaster {
    sender: broadcast::Sender<TunnelEvent>,
}

impl TunnelEventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to tunnel events
    pub fn subscribe(&self) -> broadcast::Receiver<TunnelEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TunnelEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelEventEmitter for TunnelEventBroadcaster {
    fn emit(&self, event: TunnelEvent) {
        // Nobody listening is not an error
        if self.sender.receiver_count() > 0 {
            debug!(event = event.event_name(), port = event.port(), "Broadcasting tunnel event");
            let _ = self.sender.send(event);
        }
    }

    fn clone_box(&self) -> Box<dyn TunnelEventEmitter> {
        Box::new(self.clone())
    }
}

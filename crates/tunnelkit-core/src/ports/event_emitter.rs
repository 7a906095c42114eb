//! Event emitter trait for tunnel lifecycle notifications.
//!
//! Implementations handle transport details (broadcast channels, UI bridges,
//! log lines, etc.).

use crate::events::TunnelEvent;

/// Trait for emitting tunnel events.
///
/// This abstraction keeps event plumbing consistent and prevents channel
/// types from becoming part of the public API surface.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts that don't need events
/// - `TunnelEventBroadcaster` in `tunnelkit-runtime` - tokio broadcast channel
pub trait TunnelEventEmitter: Send + Sync {
    /// Emit a tunnel event.
    ///
    /// This method should not block.
    fn emit(&self, event: TunnelEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn TunnelEventEmitter>;
}

/// A no-op event emitter that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl TunnelEventEmitter for NoopEmitter {
    fn emit(&self, _event: TunnelEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn TunnelEventEmitter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TunnelReason;
    use std::sync::Arc;

    #[test]
    fn test_noop_emitter() {
        let emitter = NoopEmitter::new();
        emitter.emit(TunnelEvent::stopped(8080, TunnelReason::ManualStop));
    }

    #[test]
    fn test_arc_emitter_clone_box() {
        let emitter: Arc<dyn TunnelEventEmitter> = Arc::new(NoopEmitter::new());
        let boxed = emitter.clone_box();
        boxed.emit(TunnelEvent::created(8080, "https://x.trycloudflare.com", false));
    }
}

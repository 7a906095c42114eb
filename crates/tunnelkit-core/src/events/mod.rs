//! Outbound tunnel lifecycle events.
//!
//! These events are the only channel through which the lifecycle manager
//! talks to the rest of the application (status views, report panels, CLI).
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag and camelCase fields:
//!
//! ```json
//! { "type": "tunnel_created", "port": 8080, "url": "https://x.trycloudflare.com", "isAutoCreated": false }
//! ```

mod reason;

use serde::{Deserialize, Serialize};

pub use reason::TunnelReason;

/// Canonical tunnel event union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TunnelEvent {
    /// A tunnel reported its public URL.
    TunnelCreated {
        /// Local port being exposed.
        port: u16,
        /// Public URL.
        url: String,
        /// Whether the tunnel was created without a user request.
        #[serde(rename = "isAutoCreated")]
        is_auto_created: bool,
    },

    /// A tunnel was torn down.
    TunnelStopped {
        /// Local port that was exposed.
        port: u16,
        /// Why the tunnel stopped.
        reason: TunnelReason,
    },

    /// A creation request ended before a process was spawned.
    TunnelCreationFailed {
        /// Local port that was requested.
        port: u16,
        /// Why creation did not proceed.
        reason: TunnelReason,
    },
}

impl TunnelEvent {
    /// Create a tunnel created event.
    pub fn created(port: u16, url: impl Into<String>, is_auto_created: bool) -> Self {
        Self::TunnelCreated {
            port,
            url: url.into(),
            is_auto_created,
        }
    }

    /// Create a tunnel stopped event.
    pub const fn stopped(port: u16, reason: TunnelReason) -> Self {
        Self::TunnelStopped { port, reason }
    }

    /// Create a creation failed event.
    pub const fn creation_failed(port: u16, reason: TunnelReason) -> Self {
        Self::TunnelCreationFailed { port, reason }
    }

    /// Get the event name for wire protocols.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::TunnelCreated { .. } => "tunnel:created",
            Self::TunnelStopped { .. } => "tunnel:stopped",
            Self::TunnelCreationFailed { .. } => "tunnel:creation_failed",
        }
    }

    /// Port the event refers to.
    pub const fn port(&self) -> u16 {
        match self {
            Self::TunnelCreated { port, .. }
            | Self::TunnelStopped { port, .. }
            | Self::TunnelCreationFailed { port, .. } => *port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_serializes_with_type_tag() {
        let event = TunnelEvent::created(8080, "https://a.trycloudflare.com", true);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"tunnel_created\""));
        assert!(json.contains("\"isAutoCreated\":true"));
        assert!(json.contains("\"port\":8080"));
    }

    #[test]
    fn stopped_carries_kebab_reason() {
        let event = TunnelEvent::stopped(3000, TunnelReason::ManualStop);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"reason\":\"manual-stop\""));
        assert_eq!(event.event_name(), "tunnel:stopped");
        assert_eq!(event.port(), 3000);
    }

    #[test]
    fn creation_failed_roundtrips() {
        let event = TunnelEvent::creation_failed(5000, TunnelReason::DownloadCancelled);
        let json = serde_json::to_string(&event).unwrap();
        let back: TunnelEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

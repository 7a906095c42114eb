//! Tunnel instance lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single tunnel instance.
///
/// ```text
/// Requested → (SecurityConfirmed) → Provisioning → Starting → AwaitingUrl → Ready
/// ```
///
/// `Stopping → Stopped` is reachable from every non-terminal state, and
/// `Failed` from `Provisioning`, `Starting`, or any state with a live process.
/// A new creation request for the same port always starts a fresh instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelState {
    /// Creation was requested, nothing has happened yet.
    Requested,
    /// The user acknowledged the public-exposure warning.
    SecurityConfirmed,
    /// Resolving or downloading the tunnel-client binary.
    Provisioning,
    /// Spawning the tunnel-client process.
    Starting,
    /// Process is running, public URL not seen yet.
    AwaitingUrl,
    /// Public URL discovered.
    Ready,
    /// Teardown in progress.
    Stopping,
    /// Torn down.
    Stopped,
    /// Provisioning or the process failed.
    Failed,
}

impl TunnelState {
    /// Whether the instance can make no further progress.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub const fn can_transition_to(self, next: Self) -> bool {
        use TunnelState::{
            AwaitingUrl, Failed, Provisioning, Ready, Requested, SecurityConfirmed, Starting,
            Stopped, Stopping,
        };
        match (self, next) {
            (Requested, SecurityConfirmed | Provisioning)
            | (SecurityConfirmed, Provisioning)
            | (Provisioning, Starting)
            | (Starting, AwaitingUrl)
            | (AwaitingUrl, Ready)
            | (Stopping, Stopped) => true,
            (Provisioning | Starting | AwaitingUrl | Ready, Failed) => true,
            (from, Stopping) => !from.is_terminal() && !matches!(from, Stopping),
            _ => false,
        }
    }

    /// Short label for logs and CLI output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::SecurityConfirmed => "security_confirmed",
            Self::Provisioning => "provisioning",
            Self::Starting => "starting",
            Self::AwaitingUrl => "awaiting_url",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TunnelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a registered tunnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelSnapshot {
    /// Local port being exposed.
    pub port: u16,
    /// Public URL, once discovered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether the tunnel was created without a user request.
    pub is_auto_created: bool,
    /// Current lifecycle state.
    pub state: TunnelState,
    /// OS process ID of the tunnel client, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// When the tunnel-client process was spawned.
    pub started_at: DateTime<Utc>,
}

/// Errors from validating a requested port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Port {0} is outside the valid range 1-65535")]
pub struct InvalidPort(pub u32);

/// Validate a raw port number.
pub fn validate_port(raw: u32) -> Result<u16, InvalidPort> {
    match u16::try_from(raw) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(InvalidPort(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let path = [
            TunnelState::Requested,
            TunnelState::SecurityConfirmed,
            TunnelState::Provisioning,
            TunnelState::Starting,
            TunnelState::AwaitingUrl,
            TunnelState::Ready,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn auto_created_skips_security_confirmation() {
        assert!(TunnelState::Requested.can_transition_to(TunnelState::Provisioning));
    }

    #[test]
    fn stopping_reachable_from_non_terminal_states() {
        for state in [
            TunnelState::Requested,
            TunnelState::Provisioning,
            TunnelState::Starting,
            TunnelState::AwaitingUrl,
            TunnelState::Ready,
        ] {
            assert!(state.can_transition_to(TunnelState::Stopping), "{state}");
        }
        assert!(!TunnelState::Stopped.can_transition_to(TunnelState::Stopping));
        assert!(!TunnelState::Failed.can_transition_to(TunnelState::Stopping));
        assert!(!TunnelState::Stopping.can_transition_to(TunnelState::Stopping));
    }

    #[test]
    fn failed_not_reachable_before_provisioning() {
        assert!(!TunnelState::Requested.can_transition_to(TunnelState::Failed));
        assert!(TunnelState::Provisioning.can_transition_to(TunnelState::Failed));
        assert!(TunnelState::Ready.can_transition_to(TunnelState::Failed));
    }

    #[test]
    fn terminal_states_go_nowhere() {
        assert!(!TunnelState::Stopped.can_transition_to(TunnelState::Requested));
        assert!(!TunnelState::Failed.can_transition_to(TunnelState::Ready));
        assert!(!TunnelState::Ready.can_transition_to(TunnelState::AwaitingUrl));
    }

    #[test]
    fn validate_port_bounds() {
        assert_eq!(validate_port(1), Ok(1));
        assert_eq!(validate_port(65535), Ok(65535));
        assert_eq!(validate_port(0), Err(InvalidPort(0)));
        assert_eq!(validate_port(65536), Err(InvalidPort(65536)));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let snapshot = TunnelSnapshot {
            port: 8080,
            url: Some("https://abc.trycloudflare.com".to_string()),
            is_auto_created: true,
            state: TunnelState::Ready,
            pid: None,
            started_at: Utc::now(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"isAutoCreated\":true"));
        assert!(json.contains("\"state\":\"ready\""));
        assert!(!json.contains("\"pid\""));
    }
}

//! Reasons attached to stop and creation-failure events.

use serde::{Deserialize, Serialize};

/// Why a tunnel stopped or failed to be created.
///
/// Serialized in kebab-case so consumers see e.g. `"manual-stop"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TunnelReason {
    /// The user declined the public-exposure warning.
    SecurityWarningCancelled,
    /// The user declined downloading the tunnel client.
    DownloadCancelled,
    /// The tunnel-client process exited with code 0.
    ProcessExitNormal,
    /// The tunnel-client process exited with a nonzero code or by signal.
    ProcessExitError,
    /// Spawning or supervising the process failed.
    ProcessError,
    /// The user closed the output surface.
    TerminalClosed,
    /// `stop_tunnel` was called.
    ManualStop,
    /// Application shutdown cleanup.
    ExtensionCleanup,
}

impl TunnelReason {
    /// Stable wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SecurityWarningCancelled => "security-warning-cancelled",
            Self::DownloadCancelled => "download-cancelled",
            Self::ProcessExitNormal => "process-exit-normal",
            Self::ProcessExitError => "process-exit-error",
            Self::ProcessError => "process-error",
            Self::TerminalClosed => "terminal-closed",
            Self::ManualStop => "manual-stop",
            Self::ExtensionCleanup => "extension-cleanup",
        }
    }

    /// Reason for a process that exited with `code` (`None` when killed by a signal).
    pub const fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::ProcessExitNormal,
            _ => Self::ProcessExitError,
        }
    }
}

impl std::fmt::Display for TunnelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

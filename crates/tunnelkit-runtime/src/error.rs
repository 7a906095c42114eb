//! Error types for the tunnel lifecycle manager.
//!
//! Every error here is scoped to a single tunnel request; none of them is
//! fatal to the host application.

use std::path::PathBuf;

use thiserror::Error;
use tunnelkit_core::{InvalidPort, PathError};

use crate::progress::ProvisionStage;

/// Errors from resolving, downloading, or installing the tunnel-client binary.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No release asset exists for this platform/architecture pair.
    #[error("No tunnel-client build for {platform}/{arch}")]
    UnsupportedPlatform { platform: String, arch: String },

    /// Network or HTTP failure while fetching the asset.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The downloaded archive could not be unpacked.
    #[error("Failed to extract archive: {0}")]
    ExtractionFailed(String),

    /// The archive did not contain a recognizable executable.
    #[error("Tunnel-client executable not found in {dir}")]
    BinaryNotFound { dir: PathBuf },

    /// The cancellation token fired at a checkpoint.
    #[error("Download cancelled while {stage}")]
    Cancelled { stage: ProvisionStage },

    /// Path resolution failed.
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionError {
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors surfaced by tunnel operations.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Requested port is outside 1-65535.
    #[error(transparent)]
    InvalidPort(#[from] InvalidPort),

    /// Binary provisioning failed or was cancelled.
    #[error("Provisioning failed: {0}")]
    Provisioning(#[from] ProvisionError),

    /// The tunnel-client process could not be spawned.
    #[error("Failed to start tunnel client {binary}: {reason}")]
    Spawn { binary: PathBuf, reason: String },

    /// The tunnel-client process failed while running.
    #[error("Tunnel client error: {0}")]
    Process(String),

    /// User confirmation was required but not available (non-interactive mode).
    #[error("User confirmation required: {message}")]
    PromptRequired { message: String },

    /// Another request for this port has not finished yet.
    #[error("Tunnel creation for port {0} is already in progress")]
    CreationInProgress(u16),

    /// The configured provider domain does not form a valid URL pattern.
    #[error("Invalid tunnel URL pattern: {0}")]
    UrlPattern(#[from] regex::Error),

    /// `cleanup` has run; no new tunnels are accepted.
    #[error("Tunnel registry has been shut down")]
    RegistryClosed,

    /// Path resolution failed.
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// IO operation failed (prompt input, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TunnelError {
    /// Create a `PromptRequired` error with a message
    pub fn prompt_required(message: impl Into<String>) -> Self {
        Self::PromptRequired {
            message: message.into(),
        }
    }

    /// Whether this error represents the user (or shutdown) cancelling.
    ///
    /// Cancellations are logged at info level, never as failures.
    pub const fn is_cancellation(&self) -> bool {
        match self {
            Self::Provisioning(e) => e.is_cancellation(),
            Self::RegistryClosed => true,
            _ => false,
        }
    }
}

/// Result type alias for tunnel operations
pub type TunnelResult<T> = Result<T, TunnelError>;

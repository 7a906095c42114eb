//! CLI-specific error types and mappings.
//!
//! Maps runtime and core errors to exit codes and user-facing messages.

use thiserror::Error;
use tunnelkit_core::{PathError, SettingsError};
use tunnelkit_runtime::{ProvisionError, TunnelError};

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument or usage error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// A confirmation was needed but could not be asked.
    #[error("{0} (rerun with --yes to accept)")]
    ConfirmationRequired(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tunnel client could not be downloaded or installed.
    #[error("{0}")]
    Provisioning(String),

    /// Process execution error.
    #[error("Process error: {0}")]
    Process(String),

    /// The user or a shutdown cancelled the operation.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h where one fits; cancellation uses the
    /// shell's SIGINT convention.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) | Self::ConfirmationRequired(_) => 2, // EX_USAGE
            Self::Io(_) => 74,                                       // EX_IOERR
            Self::Config(_) => 78,                                   // EX_CONFIG
            Self::Provisioning(_) => 69,                             // EX_UNAVAILABLE
            Self::Process(_) => 71,                                  // EX_OSERR
            Self::Cancelled(_) => 130,
        }
    }
}

impl From<ProvisionError> for CliError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Cancelled { .. } => Self::Cancelled(err.to_string()),
            ProvisionError::Path(e) => Self::Config(e.to_string()),
            ProvisionError::Io(e) => Self::Io(e.to_string()),
            other => Self::Provisioning(other.to_string()),
        }
    }
}

impl From<TunnelError> for CliError {
    fn from(err: TunnelError) -> Self {
        match err {
            TunnelError::InvalidPort(e) => Self::Arguments(e.to_string()),
            TunnelError::Provisioning(e) => e.into(),
            TunnelError::PromptRequired { message } => Self::ConfirmationRequired(message),
            TunnelError::UrlPattern(e) => Self::Config(e.to_string()),
            TunnelError::Path(e) => Self::Config(e.to_string()),
            TunnelError::Io(e) => Self::Io(e.to_string()),
            TunnelError::RegistryClosed => Self::Cancelled(err.to_string()),
            TunnelError::Spawn { .. }
            | TunnelError::Process(_)
            | TunnelError::CreationInProgress(_) => Self::Process(err.to_string()),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunnelkit_core::InvalidPort;
    use tunnelkit_runtime::ProvisionStage;

    #[test]
    fn test_cancelled_download_maps_to_sigint_code() {
        let err = CliError::from(TunnelError::from(ProvisionError::Cancelled {
            stage: ProvisionStage::Downloading,
        }));
        assert!(matches!(err, CliError::Cancelled(_)));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_download_failure_is_unavailable() {
        let err = CliError::from(ProvisionError::DownloadFailed("HTTP 404".into()));
        assert_eq!(err.exit_code(), 69);
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_prompt_required_suggests_yes_flag() {
        let err = CliError::from(TunnelError::prompt_required("Expose port 8080?"));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("--yes"));
    }

    #[test]
    fn test_invalid_port_is_usage_error() {
        let err = CliError::from(TunnelError::from(InvalidPort(0)));
        assert!(matches!(err, CliError::Arguments(_)));
    }

    #[test]
    fn test_busy_port_is_process_error() {
        let err = CliError::from(TunnelError::CreationInProgress(8080));
        assert_eq!(err.exit_code(), 71);
    }
}

//! User prompt abstraction for tunnel confirmations.
//!
//! The registry needs two kinds of answers from a human: acknowledgement
//! that a port is about to become publicly reachable, and consent to
//! download the tunnel-client binary. This trait lets CLI and GUI adapters
//! answer those without the registry knowing about any I/O.
//!
//! # Feature Flags
//!
//! - `cli`: Enables `CliPrompt` which uses stdin/stdout for interactive prompts.
//!   Without this feature, only `NonInteractivePrompt` and `AutoConfirmPrompt`
//!   are available.
//!
//! `NonInteractivePrompt` returns `Err(TunnelError::PromptRequired)` rather
//! than silently auto-confirming, so a headless host never exposes a port or
//! downloads an executable without someone having said yes.

use async_trait::async_trait;
use tunnelkit_core::DownloadTarget;

use crate::error::{TunnelError, TunnelResult};

/// A question the registry needs answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptRequest {
    /// First manual tunnel of the session: the port will be public.
    SecurityWarning { port: u16 },
    /// The tunnel-client binary is missing and must be downloaded.
    DownloadConsent { target: DownloadTarget },
}

impl PromptRequest {
    /// Text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::SecurityWarning { port } => format!(
                "Port {port} will be reachable by anyone on the internet who has the tunnel URL. Continue?"
            ),
            Self::DownloadConsent { target } => format!(
                "The tunnel client is not installed. Download {} ({})?",
                target.asset_name, target.description
            ),
        }
    }

    /// Answer assumed when the user just presses Enter.
    pub const fn default_answer(&self) -> bool {
        match self {
            Self::SecurityWarning { .. } => false,
            Self::DownloadConsent { .. } => true,
        }
    }
}

/// Trait for handling user prompts.
///
/// # Returns
/// - `Ok(true)` if the user confirmed
/// - `Ok(false)` if the user declined
/// - `Err(TunnelError::PromptRequired)` if prompting is not supported
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TunnelPrompt: Send + Sync {
    /// Ask the user to confirm `request`.
    async fn confirm(&self, request: PromptRequest) -> TunnelResult<bool>;

    /// Display an informational message to the user.
    fn info(&self, message: &str);

    /// Display a warning message to the user.
    fn warn(&self, message: &str);
}

/// Non-interactive prompt that returns errors instead of prompting.
///
/// Use this in contexts where user interaction is not available (background
/// services, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompt;

#[async_trait]
impl TunnelPrompt for NonInteractivePrompt {
    async fn confirm(&self, request: PromptRequest) -> TunnelResult<bool> {
        Err(TunnelError::prompt_required(request.message()))
    }

    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}

/// Auto-confirm prompt that always returns true.
///
/// Backs the CLI `--yes` flag. This exposes ports without a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirmPrompt;

#[async_trait]
impl TunnelPrompt for AutoConfirmPrompt {
    async fn confirm(&self, _request: PromptRequest) -> TunnelResult<bool> {
        Ok(true)
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("Warning: {message}");
    }
}

/// CLI prompt using stdin/stdout for interactive confirmation.
///
/// This is only available with the `cli` feature flag.
#[cfg(feature = "cli")]
pub mod cli_prompt {
    use super::{PromptRequest, TunnelPrompt, TunnelResult};
    use async_trait::async_trait;
    use std::io::{self, BufRead, Write};

    /// CLI prompt that reads from stdin.
    #[derive(Debug, Default)]
    pub struct CliPrompt;

    impl CliPrompt {
        /// Create a new CLI prompt.
        pub const fn new() -> Self {
            Self
        }
    }

    fn read_answer(message: &str, default: bool) -> io::Result<bool> {
        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        print!("{message} {suffix}: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;

        Ok(match input.trim().to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            // Empty or unknown input takes the default
            _ => default,
        })
    }

    #[async_trait]
    impl TunnelPrompt for CliPrompt {
        async fn confirm(&self, request: PromptRequest) -> TunnelResult<bool> {
            let message = request.message();
            let default = request.default_answer();
            let answer = tokio::task::spawn_blocking(move || read_answer(&message, default))
                .await
                .map_err(io::Error::other)??;
            Ok(answer)
        }

        fn info(&self, message: &str) {
            println!("{message}");
        }

        fn warn(&self, message: &str) {
            eprintln!("⚠️  {message}");
        }
    }
}

#[cfg(feature = "cli")]
pub use cli_prompt::CliPrompt;

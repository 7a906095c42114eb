//! Progress reporting abstraction for binary provisioning.
//!
//! Provisioning reports a fixed sequence of checkpoint stages plus byte
//! progress for the download itself. The cancellation token is checked at
//! every stage boundary.
//!
//! # Feature Flags
//!
//! - `cli`: Enables `CliProgress` which uses `indicatif` for terminal progress bars.
//!   Without this feature, only `NoopProgress` is available.

use serde::Serialize;

/// Provisioning checkpoints, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionStage {
    Preparing,
    Starting,
    Downloading,
    Processing,
    Extracting,
    Permissions,
}

impl ProvisionStage {
    /// Human-readable status line for this stage.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Preparing => "Preparing download",
            Self::Starting => "Starting download",
            Self::Downloading => "Downloading tunnel client",
            Self::Processing => "Processing download",
            Self::Extracting => "Extracting archive",
            Self::Permissions => "Setting permissions",
        }
    }
}

impl std::fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Preparing => "preparing",
            Self::Starting => "starting",
            Self::Downloading => "downloading",
            Self::Processing => "processing",
            Self::Extracting => "extracting",
            Self::Permissions => "setting permissions",
        };
        f.write_str(label)
    }
}

/// Trait for receiving progress updates during provisioning.
///
/// Implementors can display progress bars, update UI elements, or simply
/// ignore the updates (`NoopProgress`).
pub trait ProgressReporter: Send + Sync {
    /// Called when a checkpoint stage is entered.
    fn stage(&self, stage: ProvisionStage);

    /// Called when the byte transfer starts.
    ///
    /// # Arguments
    /// * `message` - Description of what's starting
    /// * `total` - Total size if known
    fn start(&self, message: &str, total: Option<u64>);

    /// Called to update byte progress.
    fn update(&self, current: u64, total: Option<u64>);

    /// Called when the operation completes successfully.
    fn finish(&self, message: &str);

    /// Called when the operation fails.
    fn finish_with_error(&self, message: &str);
}

/// A no-op progress reporter that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn stage(&self, _stage: ProvisionStage) {}
    fn start(&self, _message: &str, _total: Option<u64>) {}
    fn update(&self, _current: u64, _total: Option<u64>) {}
    fn finish(&self, _message: &str) {}
    fn finish_with_error(&self, _message: &str) {}
}

/// CLI progress reporter using indicatif for terminal progress bars.
///
/// This is only available with the `cli` feature flag.
#[cfg(feature = "cli")]
pub mod cli_progress {
    use super::{ProgressReporter, ProvisionStage};
    use indicatif::{ProgressBar, ProgressStyle};
    use std::sync::{Mutex, PoisonError};

    const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})";
    const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

    /// CLI progress reporter with terminal progress bars.
    pub struct CliProgress {
        bar: Mutex<Option<ProgressBar>>,
    }

    impl CliProgress {
        /// Create a new CLI progress reporter.
        pub fn new() -> Self {
            Self {
                bar: Mutex::new(None),
            }
        }

        fn create_download_bar(total: u64) -> ProgressBar {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                pb.set_style(style.progress_chars("█▓░"));
            }
            pb
        }

        fn create_spinner() -> ProgressBar {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
                pb.set_style(style);
            }
            pb
        }

        fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
            let mut guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard);
        }
    }

    impl Default for CliProgress {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ProgressReporter for CliProgress {
        fn stage(&self, stage: ProvisionStage) {
            self.with_bar(|bar| match bar {
                Some(pb) => pb.set_message(stage.message()),
                None => println!("{}...", stage.message()),
            });
        }

        fn start(&self, message: &str, total: Option<u64>) {
            let pb = match total {
                Some(t) if t > 0 => Self::create_download_bar(t),
                _ => Self::create_spinner(),
            };
            pb.set_message(message.to_string());
            self.with_bar(|bar| *bar = Some(pb));
        }

        fn update(&self, current: u64, total: Option<u64>) {
            self.with_bar(|bar| {
                if let Some(pb) = bar {
                    if let Some(t) = total {
                        pb.set_length(t);
                    }
                    pb.set_position(current);
                }
            });
        }

        fn finish(&self, message: &str) {
            self.with_bar(|bar| match bar.take() {
                Some(pb) => pb.finish_with_message(message.to_string()),
                None => println!("{message}"),
            });
        }

        fn finish_with_error(&self, message: &str) {
            self.with_bar(|bar| match bar.take() {
                Some(pb) => pb.abandon_with_message(message.to_string()),
                None => eprintln!("{message}"),
            });
        }
    }
}

#[cfg(feature = "cli")]
pub use cli_progress::CliProgress;

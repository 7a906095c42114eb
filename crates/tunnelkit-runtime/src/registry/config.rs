//! Registry configuration and injected collaborators.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tunnelkit_core::paths::home_dir;
use tunnelkit_core::settings::{DEFAULT_GRACE_PERIOD_SECS, DEFAULT_URL_TIMEOUT_SECS};
use tunnelkit_core::{NoopEmitter, NoopSink, Settings, TunnelEventEmitter, TunnelOutputSink};

use crate::error::TunnelResult;
use crate::progress::{NoopProgress, ProgressReporter};
use crate::prompt::{NonInteractivePrompt, TunnelPrompt};
use crate::provision::BinaryOptions;
use crate::url::QUICK_TUNNEL_DOMAIN;

/// Timing and location settings for a registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub binary: BinaryOptions,
    /// Wait between SIGTERM and SIGKILL when stopping a tunnel.
    pub grace_period: Duration,
    /// How long `create_tunnel` waits for the public URL.
    pub url_timeout: Duration,
    /// Directory tunnel clients run in.
    pub working_dir: PathBuf,
    /// Provider domain public URLs are published under.
    pub tunnel_domain: String,
}

impl RegistryConfig {
    /// Default timings with the given binary options and working directory.
    pub fn new(binary: BinaryOptions, working_dir: PathBuf) -> Self {
        Self {
            binary,
            grace_period: Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS),
            url_timeout: Duration::from_secs(DEFAULT_URL_TIMEOUT_SECS),
            working_dir,
            tunnel_domain: QUICK_TUNNEL_DOMAIN.to_string(),
        }
    }

    /// Build from settings; tunnel clients run in the user's home directory.
    pub fn from_settings(settings: &Settings) -> TunnelResult<Self> {
        let binary = BinaryOptions::from_settings(settings)?;
        Ok(Self {
            grace_period: settings.effective_grace_period(),
            url_timeout: settings.effective_url_timeout(),
            ..Self::new(binary, home_dir()?)
        })
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    #[must_use]
    pub const fn with_url_timeout(mut self, url_timeout: Duration) -> Self {
        self.url_timeout = url_timeout;
        self
    }
}

/// Adapters the registry talks to the outside world through.
///
/// Defaults are silent and non-interactive.
#[derive(Clone)]
pub struct RegistryDeps {
    pub emitter: Arc<dyn TunnelEventEmitter>,
    pub prompt: Arc<dyn TunnelPrompt>,
    pub sink: Arc<dyn TunnelOutputSink>,
    pub progress: Arc<dyn ProgressReporter>,
}

impl RegistryDeps {
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn TunnelEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn TunnelPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TunnelOutputSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }
}

impl Default for RegistryDeps {
    fn default() -> Self {
        Self {
            emitter: Arc::new(NoopEmitter::new()),
            prompt: Arc::new(NonInteractivePrompt),
            sink: Arc::new(NoopSink),
            progress: Arc::new(NoopProgress),
        }
    }
}

impl std::fmt::Debug for RegistryDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryDeps").finish_non_exhaustive()
    }
}

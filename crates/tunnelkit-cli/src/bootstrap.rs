//! CLI bootstrap - the composition root.
//!
//! This is the only place the CLI wires concrete adapters into the tunnel
//! registry: settings from disk, stdin prompts or auto-confirm, indicatif
//! progress, the terminal output sink, and a broadcast emitter the command
//! handlers subscribe to.

use std::sync::Arc;

use tunnelkit_core::Settings;
use tunnelkit_core::paths::settings_path;
use tunnelkit_runtime::{
    AutoConfirmPrompt, CliProgress, CliPrompt, RegistryConfig, RegistryDeps,
    TunnelEventBroadcaster, TunnelPrompt, TunnelRegistry,
};
use tracing::debug;

use crate::error::CliError;
use crate::presentation::TerminalSink;

/// Per-invocation options that shape the adapters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOptions {
    /// Accept every confirmation without asking.
    pub assume_yes: bool,
    /// Echo tunnel-client output.
    pub echo_output: bool,
}

/// Fully composed context for command handlers.
pub struct CliContext {
    pub settings: Settings,
    pub registry: TunnelRegistry,
    pub events: TunnelEventBroadcaster,
}

/// Load settings from the data directory and apply the binary override.
pub fn load_settings(binary_override: Option<String>) -> Result<Settings, CliError> {
    let path = settings_path()?;
    debug!(path = %path.display(), "Loading settings");
    Ok(Settings::load_from(&path)?.with_binary_override(binary_override))
}

/// Build the registry and its adapters.
pub fn bootstrap(settings: Settings, options: CliOptions) -> Result<CliContext, CliError> {
    let config = RegistryConfig::from_settings(&settings)?;
    let events = TunnelEventBroadcaster::new();

    let prompt: Arc<dyn TunnelPrompt> = if options.assume_yes {
        Arc::new(AutoConfirmPrompt)
    } else {
        Arc::new(CliPrompt::new())
    };

    let deps = RegistryDeps::default()
        .with_emitter(Arc::new(events.clone()))
        .with_prompt(prompt)
        .with_sink(Arc::new(TerminalSink::new(options.echo_output)))
        .with_progress(Arc::new(CliProgress::new()));

    let registry = TunnelRegistry::new(config, deps)?;
    Ok(CliContext {
        settings,
        registry,
        events,
    })
}

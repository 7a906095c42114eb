//! Tunnel lifecycle manager.
//!
//! Provisions the tunnel-client executable, runs one supervised process per
//! exposed port, discovers each public URL from the process output, and
//! tears tunnels down on request, on process exit, or at shutdown.
//!
//! # Structure
//!
//! - `provision` - binary lookup, download, extraction
//! - `session` - one supervised process and its output readers
//! - `url` - public URL matching
//! - `registry` - the per-port state machine tying it all together
//! - `bridge` - events and user confirmations
//! - `prompt` / `progress` - adapter traits for interactive hosts
//! - `broadcaster` - broadcast-channel event emitter

pub mod bridge;
pub mod broadcaster;
pub mod error;
pub mod progress;
pub mod prompt;
pub mod provision;
pub mod registry;
pub mod session;
pub mod url;

pub use bridge::NotificationBridge;
pub use broadcaster::TunnelEventBroadcaster;
pub use error::{ProvisionError, TunnelError, TunnelResult};
pub use progress::{NoopProgress, ProgressReporter, ProvisionStage};
pub use prompt::{AutoConfirmPrompt, NonInteractivePrompt, PromptRequest, TunnelPrompt};
pub use provision::{BinaryOptions, BinaryProvisioner};
pub use registry::{CreateOutcome, RegistryConfig, RegistryDeps, TunnelRegistry};
pub use session::{CloseMode, ProcessSession, SessionConfig, SessionEvent};
pub use url::{QUICK_TUNNEL_DOMAIN, UrlExtractor};

#[cfg(feature = "cli")]
pub use progress::CliProgress;
#[cfg(feature = "cli")]
pub use prompt::CliPrompt;

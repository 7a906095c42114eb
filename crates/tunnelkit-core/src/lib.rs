//! Core domain types and port definitions for tunnelkit.
//!
//! This crate holds everything the tunnel lifecycle manager and its adapters
//! share without pulling in process or network code: lifecycle states,
//! outbound events, presentation ports, path resolution, and settings.

pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    BinaryInfo, DownloadTarget, InvalidPort, Packaging, TargetArch, TargetPlatform,
    TunnelSnapshot, TunnelState, validate_port,
};
pub use events::{TunnelEvent, TunnelReason};
pub use paths::{PathError, ResolvedPaths};
pub use ports::{NoopEmitter, NoopSink, TunnelEventEmitter, TunnelOutputSink};
pub use settings::{Settings, SettingsError, validate_settings};

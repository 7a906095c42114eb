//! Domain types for tunnel lifecycle and binary provisioning.

mod binary;
mod tunnel;

pub use binary::{
    BINARY_STEM, BinaryInfo, DEFAULT_DOWNLOAD_BASE_URL, DownloadTarget, Packaging, TargetArch,
    TargetPlatform,
};
pub use tunnel::{InvalidPort, TunnelSnapshot, TunnelState, validate_port};

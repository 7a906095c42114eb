//! Tunnel-client binary identification and download targets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Base name of the tunnel-client executable.
pub const BINARY_STEM: &str = "cloudflared";

/// Default location of the published release assets.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str =
    "https://github.com/cloudflare/cloudflared/releases/latest/download";

/// Result of checking whether the tunnel-client binary is runnable.
///
/// Computed fresh on each provisioning attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryInfo {
    /// Whether a binary was found.
    pub exists: bool,
    /// Location of the binary that was found.
    pub path: Option<PathBuf>,
    /// Whether the binary has to be downloaded before use.
    pub needs_download: bool,
}

impl BinaryInfo {
    /// A binary present at `path`.
    pub const fn found(path: PathBuf) -> Self {
        Self {
            exists: true,
            path: Some(path),
            needs_download: false,
        }
    }

    /// No binary anywhere; a download is required.
    pub const fn missing() -> Self {
        Self {
            exists: false,
            path: None,
            needs_download: true,
        }
    }
}

/// Operating systems with published tunnel-client assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    Windows,
    Macos,
    Linux,
}

impl TargetPlatform {
    /// Platform of the running process, if supported.
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::Macos),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Executable file name on this platform.
    pub const fn binary_name(self) -> &'static str {
        match self {
            Self::Windows => "cloudflared.exe",
            Self::Macos | Self::Linux => BINARY_STEM,
        }
    }
}

/// CPU architecture as reported by `std::env::consts::ARCH`.
///
/// Kept as the raw string so unsupported values can be reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetArch(pub String);

impl TargetArch {
    /// Architecture of the running process.
    pub fn current() -> Self {
        Self(std::env::consts::ARCH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetArch {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How a release asset is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Packaging {
    /// The asset is the executable itself.
    Raw,
    /// Gzip-compressed tarball containing the executable.
    TarGz,
}

/// A concrete asset to fetch for a `(platform, arch)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTarget {
    pub platform: TargetPlatform,
    pub asset_name: &'static str,
    pub packaging: Packaging,
    /// Description for user-facing messages.
    pub description: &'static str,
}

impl DownloadTarget {
    /// Select the asset for a platform and architecture.
    ///
    /// Each platform has two architecture buckets; anything else is unsupported.
    pub fn resolve(platform: TargetPlatform, arch: &TargetArch) -> Option<Self> {
        let (asset_name, packaging, description) = match (platform, arch.as_str()) {
            (TargetPlatform::Windows, "x86_64") => {
                ("cloudflared-windows-amd64.exe", Packaging::Raw, "Windows x64")
            }
            (TargetPlatform::Windows, "x86") => {
                ("cloudflared-windows-386.exe", Packaging::Raw, "Windows x86")
            }
            (TargetPlatform::Macos, "x86_64") => {
                ("cloudflared-darwin-amd64.tgz", Packaging::TarGz, "macOS x64")
            }
            (TargetPlatform::Macos, "aarch64") => {
                ("cloudflared-darwin-arm64.tgz", Packaging::TarGz, "macOS ARM64")
            }
            (TargetPlatform::Linux, "x86_64") => {
                ("cloudflared-linux-amd64", Packaging::Raw, "Linux x64")
            }
            (TargetPlatform::Linux, "aarch64") => {
                ("cloudflared-linux-arm64", Packaging::Raw, "Linux ARM64")
            }
            _ => return None,
        };
        Some(Self {
            platform,
            asset_name,
            packaging,
            description,
        })
    }

    /// Full download URL under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.asset_name)
    }

    pub const fn is_archive(&self) -> bool {
        matches!(self.packaging, Packaging::TarGz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_two_buckets_per_platform() {
        for platform in [
            TargetPlatform::Windows,
            TargetPlatform::Macos,
            TargetPlatform::Linux,
        ] {
            let supported: Vec<_> = ["x86_64", "x86", "aarch64"]
                .into_iter()
                .filter_map(|arch| DownloadTarget::resolve(platform, &arch.into()))
                .collect();
            assert_eq!(supported.len(), 2, "{platform:?}");
        }
    }

    #[test]
    fn only_macos_assets_are_archives() {
        let mac = DownloadTarget::resolve(TargetPlatform::Macos, &"aarch64".into()).unwrap();
        assert!(mac.is_archive());
        let linux = DownloadTarget::resolve(TargetPlatform::Linux, &"x86_64".into()).unwrap();
        assert!(!linux.is_archive());
        let win = DownloadTarget::resolve(TargetPlatform::Windows, &"x86_64".into()).unwrap();
        assert!(!win.is_archive());
        assert!(win.asset_name.ends_with(".exe"));
    }

    #[test]
    fn unsupported_combination_is_none() {
        assert!(DownloadTarget::resolve(TargetPlatform::Linux, &"riscv64".into()).is_none());
        assert!(DownloadTarget::resolve(TargetPlatform::Macos, &"x86".into()).is_none());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let target = DownloadTarget::resolve(TargetPlatform::Linux, &"x86_64".into()).unwrap();
        assert_eq!(
            target.url("https://example.test/dl/"),
            "https://example.test/dl/cloudflared-linux-amd64"
        );
    }

    #[test]
    fn binary_name_has_exe_only_on_windows() {
        assert_eq!(TargetPlatform::Windows.binary_name(), "cloudflared.exe");
        assert_eq!(TargetPlatform::Linux.binary_name(), "cloudflared");
        assert_eq!(TargetPlatform::from_os("freebsd"), None);
    }
}

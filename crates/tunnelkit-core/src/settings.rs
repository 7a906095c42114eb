//! Settings domain types, loading, and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DEFAULT_DOWNLOAD_BASE_URL;

/// Seconds between the graceful stop signal and the forced kill.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// Seconds a creation request waits for the public URL.
pub const DEFAULT_URL_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the custom binary path.
pub const BINARY_PATH_ENV: &str = "TUNNELKIT_BINARY_PATH";

/// Glob patterns handed to the port-discovery collaborator by default.
pub const DEFAULT_PORT_DISCOVERY_GLOBS: [&str; 3] = [
    "**/application*.properties",
    "**/application*.yml",
    "**/application*.yaml",
];

/// Application settings structure.
///
/// All fields are optional to support partial files and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Use this tunnel-client executable instead of the cached one.
    pub custom_binary_path: Option<String>,

    /// Glob patterns used by port discovery to find declarative config files.
    pub port_discovery_globs: Option<Vec<String>>,

    /// Grace period before a stopping process is force-killed.
    pub grace_period_secs: Option<u64>,

    /// How long a creation request waits for the public URL.
    pub url_timeout_secs: Option<u64>,

    /// Base URL the release assets are fetched from.
    pub download_base_url: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            custom_binary_path: None,
            port_discovery_globs: Some(
                DEFAULT_PORT_DISCOVERY_GLOBS
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            ),
            grace_period_secs: Some(DEFAULT_GRACE_PERIOD_SECS),
            url_timeout_secs: Some(DEFAULT_URL_TIMEOUT_SECS),
            download_base_url: Some(DEFAULT_DOWNLOAD_BASE_URL.to_string()),
        }
    }

    /// Load settings from a JSON file.
    ///
    /// A missing file yields `Settings::default()`.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(SettingsError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };
        let settings: Self =
            serde_json::from_str(&raw).map_err(|e| SettingsError::Unparseable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Apply an environment override for the custom binary path.
    #[must_use]
    pub fn with_binary_override(mut self, value: Option<String>) -> Self {
        if let Some(path) = value.filter(|p| !p.trim().is_empty()) {
            self.custom_binary_path = Some(path);
        }
        self
    }

    /// Custom binary path, if configured.
    pub fn effective_custom_binary_path(&self) -> Option<PathBuf> {
        self.custom_binary_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Grace period with default fallback.
    pub fn effective_grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs.unwrap_or(DEFAULT_GRACE_PERIOD_SECS))
    }

    /// URL wait timeout with default fallback.
    pub fn effective_url_timeout(&self) -> Duration {
        Duration::from_secs(self.url_timeout_secs.unwrap_or(DEFAULT_URL_TIMEOUT_SECS))
    }

    /// Download base URL with default fallback.
    pub fn effective_download_base_url(&self) -> &str {
        self.download_base_url
            .as_deref()
            .unwrap_or(DEFAULT_DOWNLOAD_BASE_URL)
    }

    /// Port-discovery globs with default fallback.
    pub fn effective_port_discovery_globs(&self) -> Vec<String> {
        self.port_discovery_globs.clone().unwrap_or_else(|| {
            DEFAULT_PORT_DISCOVERY_GLOBS
                .iter()
                .map(ToString::to_string)
                .collect()
        })
    }
}

/// Settings error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Grace period must be at least 1 second")]
    ZeroGracePeriod,

    #[error("URL timeout must be at least 1 second")]
    ZeroUrlTimeout,

    #[error("Custom binary path cannot be empty")]
    EmptyBinaryPath,

    #[error("Download base URL must start with http:// or https://, got {0}")]
    InvalidDownloadUrl(String),

    #[error("Failed to read settings file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to parse settings file {path}: {reason}")]
    Unparseable { path: PathBuf, reason: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.grace_period_secs == Some(0) {
        return Err(SettingsError::ZeroGracePeriod);
    }

    if settings.url_timeout_secs == Some(0) {
        return Err(SettingsError::ZeroUrlTimeout);
    }

    if settings
        .custom_binary_path
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyBinaryPath);
    }

    if let Some(ref url) = settings.download_base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidDownloadUrl(url.clone()));
        }
    }

    Ok(())
}

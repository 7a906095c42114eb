//! Tunnel-client binary cache locations.

use std::path::{Path, PathBuf};

use crate::domain::TargetPlatform;

use super::error::PathError;
use super::platform::data_root;

/// Directory holding the cached tunnel-client binary under `root`.
pub fn binary_cache_dir_in(root: &Path) -> PathBuf {
    root.join("bin")
}

/// Canonical cached binary path under `root` for `platform`.
pub fn cached_binary_path_in(root: &Path, platform: TargetPlatform) -> PathBuf {
    binary_cache_dir_in(root).join(platform.binary_name())
}

/// Directory holding the cached tunnel-client binary.
pub fn binary_cache_dir() -> Result<PathBuf, PathError> {
    Ok(binary_cache_dir_in(&data_root()?))
}

/// Canonical cached binary path for the running platform.
///
/// Unsupported platforms fall back to the bare binary name.
pub fn cached_binary_path() -> Result<PathBuf, PathError> {
    let root = data_root()?;
    Ok(match TargetPlatform::current() {
        Some(platform) => cached_binary_path_in(&root, platform),
        None => binary_cache_dir_in(&root).join(crate::domain::BINARY_STEM),
    })
}

/// Location of the settings file.
pub fn settings_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("settings.json"))
}

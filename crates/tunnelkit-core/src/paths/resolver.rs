//! Resolved path summary for CLI introspection.

use std::path::PathBuf;

use super::{PathError, binary_cache_dir, cached_binary_path, data_root, home_dir, settings_path};

/// All resolved paths captured in a single struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Root directory for application data
    pub data_root: PathBuf,
    /// Directory holding the cached tunnel-client binary
    pub binary_cache_dir: PathBuf,
    /// Canonical cached binary path
    pub cached_binary_path: PathBuf,
    /// Settings file location
    pub settings_path: PathBuf,
    /// Working directory for spawned tunnel clients
    pub working_dir: PathBuf,
}

impl ResolvedPaths {
    /// Resolve all paths using the current environment.
    pub fn resolve() -> Result<Self, PathError> {
        Ok(Self {
            data_root: data_root()?,
            binary_cache_dir: binary_cache_dir()?,
            cached_binary_path: cached_binary_path()?,
            settings_path: settings_path()?,
            working_dir: home_dir()?,
        })
    }
}

impl std::fmt::Display for ResolvedPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "data_root = {}", self.data_root.display())?;
        writeln!(f, "binary_cache_dir = {}", self.binary_cache_dir.display())?;
        writeln!(
            f,
            "cached_binary_path = {}",
            self.cached_binary_path.display()
        )?;
        writeln!(f, "settings_path = {}", self.settings_path.display())?;
        write!(f, "working_dir = {}", self.working_dir.display())
    }
}

//! Platform-specific root directory resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::PathError;

/// Environment variable overriding the application data root.
pub const DATA_DIR_ENV: &str = "TUNNELKIT_DATA_DIR";

/// Get the root directory for application data (binary cache, settings).
///
/// Resolution order:
/// 1. `TUNNELKIT_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/tunnelkit`)
///
/// The directory is created if it does not exist.
pub fn data_root() -> Result<PathBuf, PathError> {
    let override_dir = env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    let root = resolve_data_root(override_dir, dirs::data_local_dir())?;
    ensure_dir(&root)?;
    Ok(root)
}

/// Pure resolution step behind [`data_root`].
pub(super) fn resolve_data_root(
    override_dir: Option<PathBuf>,
    system_data_dir: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    if let Some(path) = override_dir.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    system_data_dir
        .map(|dir| dir.join("tunnelkit"))
        .ok_or(PathError::NoDataDir)
}

/// The user's home directory.
///
/// Tunnel-client processes run from here so that an arbitrary workspace
/// root with restrictive permissions never becomes their working directory.
pub fn home_dir() -> Result<PathBuf, PathError> {
    dirs::home_dir().ok_or(PathError::NoHomeDir)
}

/// Create `path` and its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Normalize a user-provided path, expanding `~` and making it absolute.
pub fn normalize_user_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }

    let expanded = if trimmed.starts_with("~/") || trimmed == "~" {
        let home = home_dir()?;
        if trimmed == "~" {
            home
        } else {
            home.join(trimmed.trim_start_matches("~/"))
        }
    } else {
        PathBuf::from(trimmed)
    };

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(expanded))
            .map_err(|e| PathError::CurrentDirError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_system_dir() {
        let root = resolve_data_root(
            Some(PathBuf::from("/tmp/tk-override")),
            Some(PathBuf::from("/home/u/.local/share")),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/tmp/tk-override"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let root = resolve_data_root(
            Some(PathBuf::new()),
            Some(PathBuf::from("/home/u/.local/share")),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/home/u/.local/share/tunnelkit"));
    }

    #[test]
    fn missing_system_dir_is_error() {
        assert!(matches!(
            resolve_data_root(None, None),
            Err(PathError::NoDataDir)
        ));
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Idempotent
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(matches!(normalize_user_path("   "), Err(PathError::EmptyPath)));
    }

    #[test]
    fn normalize_keeps_absolute() {
        let p = normalize_user_path("/usr/local/bin/cloudflared").unwrap();
        assert_eq!(p, PathBuf::from("/usr/local/bin/cloudflared"));
    }
}

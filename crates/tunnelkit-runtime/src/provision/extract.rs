//! Archive extraction and executable installation.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::debug;
use tunnelkit_core::domain::BINARY_STEM;

use crate::error::ProvisionError;

/// Unpack a `.tgz` archive into `staging`.
///
/// Blocking; call from `spawn_blocking`.
pub(super) fn unpack_tar_gz(archive: &Path, staging: &Path) -> Result<(), ProvisionError> {
    fs::create_dir_all(staging)?;
    let file = File::open(archive)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    // `unpack` rejects entries that escape `staging`
    tarball
        .unpack(staging)
        .map_err(|e| ProvisionError::ExtractionFailed(e.to_string()))
}

/// Locate the tunnel-client executable in an extracted tree.
///
/// Prefers an exact `binary_name` match; otherwise takes the first regular
/// file whose name starts with the binary stem.
pub(super) fn find_executable(dir: &Path, binary_name: &str) -> Result<PathBuf, ProvisionError> {
    let mut prefixed = None;
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries: Vec<_> = fs::read_dir(&current)?.collect::<Result<_, _>>()?;
        entries.sort_by_key(std::fs::DirEntry::file_name);
        for entry in entries {
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == binary_name {
                return Ok(path);
            }
            if prefixed.is_none() && name.starts_with(BINARY_STEM) {
                prefixed = Some(path);
            }
        }
    }

    prefixed.ok_or_else(|| ProvisionError::BinaryNotFound {
        dir: dir.to_path_buf(),
    })
}

/// Move `from` onto `to`, replacing any existing file.
pub(super) fn install(from: &Path, to: &Path) -> Result<(), ProvisionError> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    if let Err(e) = fs::rename(from, to) {
        // Cross-device moves fall back to copy
        debug!(error = %e, "rename failed, copying instead");
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

/// Mark `path` executable (0o755). No-op off Unix.
pub(super) fn make_executable(path: &Path) -> Result<(), ProvisionError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Removes a file or directory when dropped.
///
/// Covers the temporary archive and the extraction staging directory on
/// every exit path, including cancellation and errors.
pub(super) struct TempPath(PathBuf);

impl TempPath {
    pub(super) const fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub(super) fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        let result = if self.0.is_dir() {
            fs::remove_dir_all(&self.0)
        } else {
            fs::remove_file(&self.0)
        };
        if let Err(e) = result {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.0.display(), error = %e, "failed to remove temporary path");
            }
        }
    }
}

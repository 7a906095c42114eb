//! Tunnel-client binary provisioning.
//!
//! Resolves the executable from a custom path or the cache directory, and
//! downloads it from the release host when absent:
//!
//! ```text
//! preparing → starting → downloading → processing → (extracting) → permissions
//! ```
//!
//! The cancellation token is checked at each of those checkpoints and
//! between download chunks. Failures are reported once; nothing is retried.

mod extract;

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tunnelkit_core::domain::DEFAULT_DOWNLOAD_BASE_URL;
use tunnelkit_core::paths::{binary_cache_dir_in, data_root};
use tunnelkit_core::{BinaryInfo, DownloadTarget, Settings, TargetArch, TargetPlatform};

use crate::error::ProvisionError;
use crate::progress::{ProgressReporter, ProvisionStage};
use extract::TempPath;

/// Where the provisioner looks for and installs the binary.
#[derive(Debug, Clone)]
pub struct BinaryOptions {
    /// Use this executable if it exists instead of the cached one.
    pub custom_path: Option<PathBuf>,
    /// Cache directory (`<data_root>/bin`).
    pub cache_dir: PathBuf,
    /// Release host base URL.
    pub download_base_url: String,
}

impl BinaryOptions {
    /// Options rooted at `data_root` with no custom path.
    pub fn in_data_root(data_root: &Path) -> Self {
        Self {
            custom_path: None,
            cache_dir: binary_cache_dir_in(data_root),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
        }
    }

    /// Options from settings, rooted at the resolved data directory.
    pub fn from_settings(settings: &Settings) -> Result<Self, ProvisionError> {
        let root = data_root()?;
        Ok(Self {
            custom_path: settings.effective_custom_binary_path(),
            download_base_url: settings.effective_download_base_url().to_string(),
            ..Self::in_data_root(&root)
        })
    }
}

/// Provisions the tunnel-client executable.
#[derive(Debug, Clone)]
pub struct BinaryProvisioner {
    options: BinaryOptions,
    client: Client,
}

impl BinaryProvisioner {
    pub fn new(options: BinaryOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    pub const fn options(&self) -> &BinaryOptions {
        &self.options
    }

    /// Canonical cached path for `platform`.
    pub fn cached_path(&self, platform: TargetPlatform) -> PathBuf {
        // cache_dir is already `<root>/bin`
        self.options.cache_dir.join(platform.binary_name())
    }

    /// Report where the binary is, or that it must be downloaded.
    ///
    /// A configured custom path wins when it exists on disk; otherwise the
    /// cache location for the running platform is checked. Computed fresh
    /// on every call.
    pub fn check_availability(&self) -> BinaryInfo {
        if let Some(custom) = self.options.custom_path.as_ref() {
            if custom.is_file() {
                debug!(path = %custom.display(), "Using custom tunnel-client binary");
                return BinaryInfo::found(custom.clone());
            }
            debug!(path = %custom.display(), "Custom tunnel-client path does not exist, checking cache");
        }

        let Some(platform) = TargetPlatform::current() else {
            return BinaryInfo::missing();
        };
        let cached = self.cached_path(platform);
        if cached.is_file() {
            BinaryInfo::found(cached)
        } else {
            BinaryInfo::missing()
        }
    }

    /// Asset for the running platform.
    pub fn current_target(&self) -> Result<DownloadTarget, ProvisionError> {
        let arch = TargetArch::current();
        let platform = TargetPlatform::current().ok_or_else(|| ProvisionError::UnsupportedPlatform {
            platform: std::env::consts::OS.to_string(),
            arch: arch.as_str().to_string(),
        })?;
        resolve_target(platform, &arch)
    }

    /// Download for the running platform.
    pub async fn download_current(
        &self,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, ProvisionError> {
        let arch = TargetArch::current();
        let platform = TargetPlatform::current().ok_or_else(|| ProvisionError::UnsupportedPlatform {
            platform: std::env::consts::OS.to_string(),
            arch: arch.as_str().to_string(),
        })?;
        self.download(platform, &arch, cancel, progress).await
    }

    /// Download and install the binary for `(platform, arch)`.
    ///
    /// Returns the canonical cached path. The temporary download and any
    /// extraction staging directory are removed whether this succeeds,
    /// fails, or is cancelled.
    pub async fn download(
        &self,
        platform: TargetPlatform,
        arch: &TargetArch,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, ProvisionError> {
        let result = self.download_inner(platform, arch, cancel, progress).await;
        match &result {
            Ok(path) => {
                progress.finish("Tunnel client installed");
                info!(path = %path.display(), "Tunnel client installed");
            }
            Err(e) if e.is_cancellation() => {
                progress.finish_with_error("Download cancelled");
                info!("Tunnel client download cancelled");
            }
            Err(e) => progress.finish_with_error(&format!("Download failed: {e}")),
        }
        result
    }

    async fn download_inner(
        &self,
        platform: TargetPlatform,
        arch: &TargetArch,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, ProvisionError> {
        checkpoint(cancel, progress, ProvisionStage::Preparing)?;
        let target = resolve_target(platform, arch)?;
        tokio::fs::create_dir_all(&self.options.cache_dir).await?;
        let dest = self.cached_path(platform);
        let temp = TempPath::new(
            self.options
                .cache_dir
                .join(format!("{}.download", target.asset_name)),
        );

        checkpoint(cancel, progress, ProvisionStage::Starting)?;
        let url = target.url(&self.options.download_base_url);
        info!(url = %url, asset = target.asset_name, "Downloading tunnel client");
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(ProvisionError::Cancelled { stage: ProvisionStage::Starting });
            }
            response = self.client.get(&url).header("User-Agent", "tunnelkit").send() => {
                response.map_err(|e| ProvisionError::DownloadFailed(e.to_string()))?
            }
        };
        if !response.status().is_success() {
            return Err(ProvisionError::DownloadFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        checkpoint(cancel, progress, ProvisionStage::Downloading)?;
        let total = response.content_length();
        progress.start(target.description, total);
        let mut file = tokio::fs::File::create(temp.path()).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(ProvisionError::Cancelled { stage: ProvisionStage::Downloading });
                }
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk.map_err(|e| ProvisionError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress.update(downloaded, total);
        }

        checkpoint(cancel, progress, ProvisionStage::Processing)?;
        file.flush().await?;
        drop(file);
        debug!(bytes = downloaded, "Download complete");

        if target.is_archive() {
            checkpoint(cancel, progress, ProvisionStage::Extracting)?;
            let staging = TempPath::new(
                self.options
                    .cache_dir
                    .join(format!(".extract-{}", target.asset_name)),
            );
            let archive = temp.path().to_path_buf();
            let staging_dir = staging.path().to_path_buf();
            let binary_name = platform.binary_name();
            let dest_clone = dest.clone();
            tokio::task::spawn_blocking(move || {
                extract::unpack_tar_gz(&archive, &staging_dir)?;
                let found = extract::find_executable(&staging_dir, binary_name)?;
                extract::install(&found, &dest_clone)
            })
            .await
            .map_err(|e| ProvisionError::ExtractionFailed(e.to_string()))??;
        } else {
            let from = temp.path().to_path_buf();
            let to = dest.clone();
            tokio::task::spawn_blocking(move || extract::install(&from, &to))
                .await
                .map_err(|e| ProvisionError::Io(std::io::Error::other(e)))??;
        }

        checkpoint(cancel, progress, ProvisionStage::Permissions)?;
        extract::make_executable(&dest)?;

        Ok(dest)
    }
}

fn resolve_target(
    platform: TargetPlatform,
    arch: &TargetArch,
) -> Result<DownloadTarget, ProvisionError> {
    DownloadTarget::resolve(platform, arch).ok_or_else(|| ProvisionError::UnsupportedPlatform {
        platform: format!("{platform:?}").to_lowercase(),
        arch: arch.as_str().to_string(),
    })
}

/// Report `stage` and bail out if cancellation was requested.
fn checkpoint(
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
    stage: ProvisionStage,
) -> Result<(), ProvisionError> {
    if cancel.is_cancelled() {
        return Err(ProvisionError::Cancelled { stage });
    }
    debug!(%stage, "Provisioning checkpoint");
    progress.stage(stage);
    Ok(())
}

//! Install command handler.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tunnelkit_runtime::CliProgress;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Download the tunnel client for this platform into the cache.
///
/// Ctrl-C cancels the download; partial files are removed by the provisioner.
pub async fn execute(ctx: &CliContext, force: bool) -> Result<()> {
    let provisioner = ctx.registry.provisioner();
    let info = provisioner.check_availability();
    if let (Some(path), false) = (info.path.as_ref(), force) {
        println!("Tunnel client already available at {}", path.display());
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let progress = CliProgress::new();
    let result = provisioner.download_current(&cancel, &progress).await;
    watcher.abort();

    match result {
        Ok(path) => {
            println!("Installed tunnel client to {}", path.display());
            Ok(())
        }
        Err(e) if e.is_cancellation() => {
            info!("Install cancelled");
            Err(CliError::from(e).into())
        }
        Err(e) => Err(CliError::from(e).into()),
    }
}

//! Status command handler.

use anyhow::Result;
use serde_json::json;
use tunnelkit_core::TargetPlatform;

use crate::bootstrap::CliContext;

/// Print whether the tunnel client is available, where it is, and which
/// release asset this platform would download.
pub fn execute(ctx: &CliContext, as_json: bool) -> Result<()> {
    let provisioner = ctx.registry.provisioner();
    let info = provisioner.check_availability();
    let cached = TargetPlatform::current().map(|platform| provisioner.cached_path(platform));
    let target = provisioner.current_target().ok();

    if as_json {
        let value = json!({
            "binary": info,
            "cachedPath": cached,
            "asset": target.as_ref().map(|t| t.asset_name),
            "downloadUrl": target
                .as_ref()
                .map(|t| t.url(&provisioner.options().download_base_url)),
            "portDiscoveryGlobs": ctx.settings.effective_port_discovery_globs(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match info.path.as_ref() {
        Some(path) => println!("Tunnel client: installed ({})", path.display()),
        None => println!("Tunnel client: not installed (run `tunnelkit install`)"),
    }
    if let Some(path) = cached {
        println!("Cache path:    {}", path.display());
    }
    match target {
        Some(target) => println!(
            "Platform:      {} ({})",
            target.description, target.asset_name
        ),
        None => println!("Platform:      unsupported"),
    }
    if let Some(custom) = ctx.settings.effective_custom_binary_path() {
        println!("Override:      {}", custom.display());
    }
    println!(
        "Port globs:    {}",
        ctx.settings.effective_port_discovery_globs().join(", ")
    );
    Ok(())
}

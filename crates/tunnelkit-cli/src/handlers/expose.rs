//! Expose command handler.
//!
//! Creates one tunnel per requested port, prints lifecycle events as they
//! arrive, and keeps running until Ctrl-C or until every tunnel has gone.
//! Shutdown always goes through `TunnelRegistry::cleanup` so no tunnel-client
//! process outlives the CLI.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tunnelkit_core::TunnelEvent;
use tunnelkit_runtime::{CreateOutcome, TunnelEventBroadcaster};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{format_event, format_snapshot};

const LIVENESS_POLL: Duration = Duration::from_millis(500);

/// Arguments for the expose command.
#[derive(Debug, Clone)]
pub struct ExposeArgs {
    pub ports: Vec<u16>,
    pub auto: bool,
    pub json: bool,
}

pub async fn execute(ctx: &CliContext, args: ExposeArgs) -> Result<()> {
    let printer = spawn_event_printer(&ctx.events, args.json);

    let mut last_error = None;
    for &port in &args.ports {
        match ctx.registry.create_tunnel(port, args.auto).await {
            Ok(outcome) => report_outcome(port, &outcome),
            Err(e) if e.is_cancellation() => {
                info!(port = %port, "Tunnel creation cancelled");
                last_error = Some(CliError::from(e));
                break;
            }
            Err(e) => {
                eprintln!("[{port}] {e}");
                last_error = Some(CliError::from(e));
            }
        }
    }

    let active = ctx.registry.get_active_tunnels();
    if active.is_empty() {
        ctx.registry.cleanup().await;
        printer.abort();
        return match last_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        };
    }

    if !args.json {
        println!();
        println!("{:<6} {:<14} {:<8} {:<9} URL", "PORT", "STATE", "PID", "STARTED");
        for snapshot in &active {
            println!("{}", format_snapshot(snapshot));
        }
        println!();
        println!("Press Ctrl-C to stop all tunnels.");
    }

    wait_for_shutdown(ctx).await;

    let stopped = ctx.registry.cleanup().await;
    info!(count = stopped, "Tunnels cleaned up");
    // Let the printer flush the cleanup events before exiting
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    Ok(())
}

fn report_outcome(port: u16, outcome: &CreateOutcome) {
    match outcome {
        // Ready is printed by the event printer from TunnelCreated
        CreateOutcome::Ready(_) => {}
        CreateOutcome::Reused(url) => println!("[{port}] already exposed at {url}"),
        CreateOutcome::Pending => {
            println!("[{port}] tunnel is running but has not reported a URL yet");
        }
        CreateOutcome::Stopped => println!("[{port}] tunnel exited before reporting a URL"),
        CreateOutcome::Declined(reason) => println!("[{port}] not exposed ({reason})"),
    }
}

/// Resolve on Ctrl-C or once the registry holds no tunnels.
async fn wait_for_shutdown(ctx: &CliContext) {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = tokio::time::interval(LIVENESS_POLL);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                println!();
                println!("Stopping tunnels...");
                return;
            }
            _ = poll.tick() => {
                if ctx.registry.get_active_tunnels().is_empty() {
                    info!("All tunnels have exited");
                    return;
                }
            }
        }
    }
}

fn spawn_event_printer(events: &TunnelEventBroadcaster, json: bool) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event, json),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &TunnelEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, event = event.event_name(), "Failed to serialize event"),
        }
    } else {
        println!("{}", format_event(event));
    }
}

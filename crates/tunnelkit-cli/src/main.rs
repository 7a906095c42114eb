//! CLI entry point - the composition root.
//!
//! Initializes logging, parses arguments, bootstraps the registry, and
//! routes each command to its handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tunnelkit_cli::handlers::expose::ExposeArgs;
use tunnelkit_cli::{Cli, CliError, CliOptions, Commands, bootstrap, handlers, load_settings};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Paths must work even when settings are broken
    if matches!(cli.command, Commands::Paths) {
        return handlers::paths::execute();
    }

    let settings = load_settings(cli.binary)?;

    match cli.command {
        Commands::Expose {
            ports,
            auto,
            yes,
            logs,
            json,
        } => {
            let options = CliOptions {
                assume_yes: yes,
                echo_output: logs,
            };
            let ctx = bootstrap(settings, options)?;
            handlers::expose::execute(&ctx, ExposeArgs { ports, auto, json }).await
        }
        Commands::Install { force } => {
            let ctx = bootstrap(settings, CliOptions::default())?;
            handlers::install::execute(&ctx, force).await
        }
        Commands::Status { json } => {
            let ctx = bootstrap(settings, CliOptions::default())?;
            handlers::status::execute(&ctx, json)
        }
        Commands::Paths => handlers::paths::execute(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        eprintln!("Error: {err:#}");
        std::process::exit(code);
    }
    Ok(())
}

//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use clap::Parser;
use tunnelkit_core::settings::BINARY_PATH_ENV;

use crate::commands::Commands;

/// Command-line interface for exposing local ports through public tunnels.
#[derive(Parser, Debug)]
#[command(name = "tunnelkit")]
#[command(about = "Expose local ports to the internet through supervised tunnels")]
#[command(version)]
pub struct Cli {
    /// Use this tunnel-client executable instead of the cached download
    #[arg(long = "binary", global = true, env = BINARY_PATH_ENV)]
    pub binary: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "tunnelkit",
            "--verbose",
            "--binary",
            "/opt/cloudflared",
            "status",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.binary.as_deref(), Some("/opt/cloudflared"));
        assert!(matches!(cli.command, Commands::Status { json: false }));
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::parse_from(["tunnelkit", "paths", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Paths));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["tunnelkit"]).is_err());
    }
}

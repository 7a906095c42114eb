//! Subcommands of the `tunnelkit` binary.

use clap::Subcommand;

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expose one or more local ports and keep the tunnels up until Ctrl-C
    Expose {
        /// Local ports to expose (1-65535)
        #[arg(required = true, value_parser = clap::value_parser!(u16).range(1..))]
        ports: Vec<u16>,
        /// Mark tunnels as auto-created (skips the public-exposure warning)
        #[arg(long)]
        auto: bool,
        /// Answer yes to every confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Echo tunnel-client output to the terminal
        #[arg(long)]
        logs: bool,
        /// Print lifecycle events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Download the tunnel-client executable for this platform
    Install {
        /// Download even when a binary is already available
        #[arg(short, long)]
        force: bool,
    },

    /// Show whether the tunnel client is installed and where
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved paths for all tunnelkit directories
    Paths,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::parser::Cli;

    #[test]
    fn test_expose_collects_ports_and_flags() {
        let cli = Cli::parse_from(["tunnelkit", "expose", "8080", "3000", "--auto", "-y"]);
        match cli.command {
            Commands::Expose {
                ports,
                auto,
                yes,
                logs,
                json,
            } => {
                assert_eq!(ports, vec![8080, 3000]);
                assert!(auto);
                assert!(yes);
                assert!(!logs);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_expose_requires_a_port() {
        assert!(Cli::try_parse_from(["tunnelkit", "expose"]).is_err());
    }

    #[test]
    fn test_expose_rejects_port_zero_and_overflow() {
        assert!(Cli::try_parse_from(["tunnelkit", "expose", "0"]).is_err());
        assert!(Cli::try_parse_from(["tunnelkit", "expose", "70000"]).is_err());
    }

    #[test]
    fn test_install_force_flag() {
        let cli = Cli::parse_from(["tunnelkit", "install", "--force"]);
        assert!(matches!(cli.command, Commands::Install { force: true }));
    }
}

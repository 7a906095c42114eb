//! Command-line adapter for tunnelkit.
//!
//! Parses arguments, composes the tunnel registry with terminal adapters,
//! and dispatches to handlers.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliContext, CliOptions, bootstrap, load_settings};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;

//! Command handlers.
//!
//! Handlers are thin wrappers: they call into the registry or provisioner
//! held by [`CliContext`](crate::bootstrap::CliContext) and format the result
//! for the terminal. Lifecycle logic lives in `tunnelkit-runtime`.

pub mod expose;
pub mod install;
pub mod paths;
pub mod status;

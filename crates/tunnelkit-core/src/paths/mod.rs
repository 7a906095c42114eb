//! Path utilities for tunnelkit data directories.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately
//! - `*_in` variants take an explicit root so callers and tests can avoid
//!   the process environment

mod binary;
mod error;
mod platform;
mod resolver;

pub use binary::{
    binary_cache_dir, binary_cache_dir_in, cached_binary_path, cached_binary_path_in,
    settings_path,
};
pub use error::PathError;
pub use platform::{DATA_DIR_ENV, data_root, ensure_dir, home_dir, normalize_user_path};
pub use resolver::ResolvedPaths;

//! Filesystem primitives for Stage
//!
//! Provides normalized path handling, directory lifecycle helpers, the
//! ownership lock held by live workspaces, and safe I/O operations shared by
//! every workspace component.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use constants::{LOCK_FILENAME, WorkspaceDir};
pub use error::{Error, Result};
pub use path::{NormalizedPath, sanitize_file_name, unique_file_name};

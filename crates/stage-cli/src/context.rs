//! Configuration resolution
//!
//! Settings come from the `--config` file (or `STAGE_CONFIG`) when given,
//! otherwise from defaults, and `--cache-root` overrides either.

use std::path::Path;

use stage_core::StageConfig;

use crate::error::{CliError, Result};

/// Build the effective configuration for this invocation.
pub fn load_config(config_path: Option<&Path>, cache_root: Option<&Path>) -> Result<StageConfig> {
    let mut config = match config_path {
        Some(path) if !path.is_file() => {
            return Err(CliError::user(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };

    if let Some(root) = cache_root {
        config.cache_root = root.to_path_buf();
    }
    tracing::debug!(cache_root = %config.cache_root.display(), "Resolved configuration");
    Ok(config)
}

//! Runtime configuration
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration rooted in the user's cache directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stage_bundle::MANIFEST_FILENAME;
use stage_bundle::archive::DEFAULT_MAX_ENTRIES;
use stage_fs::{ConfigStore, NormalizedPath};

use crate::Result;
use crate::workspace::WorkspaceKind;

fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("stage")
}

fn default_importer_dir() -> String {
    "importer".to_string()
}

fn default_exporter_dir() -> String {
    "exporter".to_string()
}

fn default_editor_dir() -> String {
    "editor".to_string()
}

fn default_manifest_file_name() -> String {
    MANIFEST_FILENAME.to_string()
}

fn default_max_archive_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_purge_on_start() -> bool {
    true
}

/// Settings for a [`Workspaces`](crate::Workspaces) service.
///
/// # Example
///
/// ```toml
/// cache_root = "/var/tmp/stage"
/// max_archive_entries = 2000
/// purge_on_start = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Base directory holding one container root per workspace kind
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    #[serde(default = "default_importer_dir")]
    pub importer_dir: String,

    #[serde(default = "default_exporter_dir")]
    pub exporter_dir: String,

    #[serde(default = "default_editor_dir")]
    pub editor_dir: String,

    /// Manifest looked up inside bundles
    #[serde(default = "default_manifest_file_name")]
    pub manifest_file_name: String,

    /// Archives with more entries than this are rejected
    #[serde(default = "default_max_archive_entries")]
    pub max_archive_entries: usize,

    /// Remove orphaned workspace directories when the service starts
    #[serde(default = "default_purge_on_start")]
    pub purge_on_start: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            importer_dir: default_importer_dir(),
            exporter_dir: default_exporter_dir(),
            editor_dir: default_editor_dir(),
            manifest_file_name: default_manifest_file_name(),
            max_archive_entries: default_max_archive_entries(),
            purge_on_start: default_purge_on_start(),
        }
    }
}

impl StageConfig {
    /// Load a configuration file. The format follows the extension
    /// (`.toml`, `.json`, `.yaml`/`.yml`).
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = ConfigStore::new().load(&NormalizedPath::new(path))?;
        tracing::debug!(path = %path.display(), cache_root = %config.cache_root.display(), "Loaded configuration");
        Ok(config)
    }

    /// Default configuration with a different cache root.
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    /// Root directory of the container for `kind`.
    pub fn container_root(&self, kind: WorkspaceKind) -> PathBuf {
        let dir = match kind {
            WorkspaceKind::Importer => &self.importer_dir,
            WorkspaceKind::Exporter => &self.exporter_dir,
            WorkspaceKind::Editor => &self.editor_dir,
        };
        self.cache_root.join(dir)
    }
}

//! [`TestStage`]: temporary directories for Stage test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::bundle;

/// A temporary area split into a cache root (where containers live) and a
/// sources directory (where test inputs are written).
///
/// # Example
///
/// ```rust,no_run
/// use stage_test_utils::stage::TestStage;
///
/// let stage = TestStage::new();
/// let bundle = stage.write_bundle("a.flex", "sunset-pack", "1.0.0");
/// let text = stage.write_source("b.txt", "hello");
/// stage.assert_dir_empty("cache/importer");
/// ```
pub struct TestStage {
    temp_dir: TempDir,
}

impl Default for TestStage {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStage {
    /// Create the temporary area with empty `cache/` and `sources/`.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("cache")).unwrap();
        fs::create_dir_all(temp_dir.path().join("sources")).unwrap();
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory to use as the configured cache root.
    pub fn cache_root(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn sources(&self) -> PathBuf {
        self.root().join("sources")
    }

    /// Write a text file under `sources/` and return its path.
    pub fn write_source(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.sources().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a well-formed bundle under `sources/` and return its path.
    pub fn write_bundle(&self, relative: &str, name: &str, version: &str) -> PathBuf {
        let path = self.sources().join(relative);
        bundle::write_bundle(&path, name, version);
        path
    }

    /// Create a leftover workspace directory at `relative` under the root.
    pub fn write_orphan(&self, relative: &str) -> PathBuf {
        crate::orphan::write_orphan(&self.root().join(relative))
    }

    /// Number of entries directly inside `relative` (0 when it is missing).
    pub fn count_entries(&self, relative: &str) -> usize {
        fs::read_dir(self.root().join(relative))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected path to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected path NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the directory `path` is missing or has no entries.
    ///
    /// # Panics
    /// Panics listing the leftover entries otherwise.
    pub fn assert_dir_empty(&self, path: &str) {
        let full_path = self.root().join(path);
        let leftovers: Vec<_> = fs::read_dir(&full_path)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.file_name()).collect())
            .unwrap_or_default();
        assert!(
            leftovers.is_empty(),
            "Expected {} to be empty, found {:?}",
            full_path.display(),
            leftovers
        );
    }
}

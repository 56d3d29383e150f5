//! Workspace-shaped directories whose owner is gone.

use std::fs;
use std::path::{Path, PathBuf};

/// Create `dir` the way a process that exited without disposing its
/// workspace leaves it: an `input/` subdirectory and an unlocked lock file.
///
/// # Panics
/// Panics if the directory cannot be written.
pub fn write_orphan(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir.join("input"))
        .unwrap_or_else(|e| panic!("write_orphan: failed to create {}: {e}", dir.display()));
    fs::write(dir.join(stage_fs::LOCK_FILENAME), b"")
        .unwrap_or_else(|e| panic!("write_orphan: failed to write lock file in {}: {e}", dir.display()));
    dir.to_path_buf()
}

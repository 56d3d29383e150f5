//! Well-known directory and file names inside workspace trees.

use std::path::Path;

/// Lock file held by a live workspace for as long as it owns its directory.
pub const LOCK_FILENAME: &str = ".stage.lock";

/// Fixed subdirectory names used by the workspace layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceDir {
    /// Staged input items of an importer workspace
    Input,
    /// Per-item extraction output of an importer workspace
    Output,
    /// Files assembled for an export
    Package,
    /// Unpacked bundle contents of an editor workspace
    Contents,
}

impl WorkspaceDir {
    /// Get the string representation of the directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Package => "package",
            Self::Contents => "contents",
        }
    }
}

impl AsRef<Path> for WorkspaceDir {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for WorkspaceDir {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for WorkspaceDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

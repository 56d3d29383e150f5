use std::path::PathBuf;

/// Errors that can occur while interpreting a bundle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file is not in a recognised archive format.
    #[error("not a recognised archive: {0}")]
    NotAnArchive(PathBuf),

    /// The archive is recognised but could not be read.
    #[error("failed to read archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// An archive entry would be written outside the destination directory.
    #[error("archive entry '{entry}' escapes the extraction directory")]
    UnsafeEntry { entry: String },

    /// The archive holds more entries than the configured limit.
    #[error("archive has {found} entries, limit is {limit}")]
    TooManyEntries { found: usize, limit: usize },

    /// Manifest file not found at the expected location.
    #[error("extension manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    /// Failed to parse manifest JSON.
    #[error("failed to parse extension manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// Invalid extension name.
    #[error("invalid extension name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Invalid semver version string.
    #[error("invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },

    /// A file listed in the manifest is not a confined relative path.
    #[error("invalid file path in manifest: {path}")]
    InvalidFilePath { path: String },

    /// Failed to serialize extension manifest.
    #[error("failed to serialize extension manifest: {0}")]
    ManifestSerialize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fs(#[from] stage_fs::Error),
}

impl Error {
    /// Whether the failure concerns the manifest rather than the archive.
    pub fn is_manifest_error(&self) -> bool {
        matches!(
            self,
            Self::ManifestNotFound(_)
                | Self::ManifestParse(_)
                | Self::InvalidName { .. }
                | Self::InvalidVersion { .. }
                | Self::InvalidFilePath { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for stage-core

use std::path::PathBuf;

use crate::resolver::ResolveError;
use crate::workspace::WorkspaceKind;

/// Result type for stage-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stage-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A workspace with this identifier is already registered
    #[error("Workspace {id} is already registered")]
    DuplicateIdentifier { id: String },

    /// Workspace kind does not match the container
    #[error("Expected {expected} workspace, got {actual} workspace")]
    KindMismatch {
        expected: WorkspaceKind,
        actual: WorkspaceKind,
    },

    /// Workspace was created by a different container
    #[error("Workspace {id} belongs to another container")]
    ForeignWorkspace { id: String },

    /// The filesystem refused to create a workspace directory
    #[error("Failed to create workspace directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata for a locator could not be resolved
    #[error("Metadata unavailable for {locator}: {source}")]
    ResourceMetadataUnavailable {
        locator: String,
        #[source]
        source: ResolveError,
    },

    /// Streaming a locator's bytes into the workspace failed
    #[error("Failed to stage {locator}: {source}")]
    Staging {
        locator: String,
        #[source]
        source: ResolveError,
    },

    /// An import was requested without any locators
    #[error("Import request contains no locators")]
    NoLocators,

    /// Operation on a workspace that has been disposed
    #[error("Workspace {id} has been disposed")]
    Disposed { id: String },

    #[error(transparent)]
    Bundle(#[from] stage_bundle::Error),

    #[error(transparent)]
    Fs(#[from] stage_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

//! Workspace core for Stage
//!
//! Disposable, directory-backed workspaces used while importing, exporting
//! or editing resource bundles, the per-kind registries that track them, and
//! the pipelines that populate them.
//!
//! The usual entry point is [`Workspaces`], which owns one
//! [`WorkspacesContainer`] per [`WorkspaceKind`] and the collaborators used
//! to stage and interpret items.

pub mod config;
pub mod container;
pub mod editor;
pub mod error;
pub mod export;
pub mod import;
pub mod resolver;
pub mod service;
pub mod workspace;

pub use config::StageConfig;
pub use container::{PurgeReport, WorkspacesContainer};
pub use editor::EditorPipeline;
pub use error::{Error, Result};
pub use export::ExportPipeline;
pub use import::{Collaborators, ImportPipeline};
pub use resolver::{FileResolver, Locator, ResolveError, ResourceMetadata, ResourceResolver};
pub use service::{Workspaces, WorkspacesBuilder};
pub use workspace::{FileInfo, SkipReason, Workspace, WorkspaceKind, WorkspaceState};

//! Disposable, directory-backed workspaces
//!
//! A [`Workspace`] moves through three states: uninitialized (constructed,
//! nothing on disk), active (directories created) and disposed (directory
//! tree deleted, deregistered from its container). The three kinds share
//! identity and lifecycle and differ only in their subdirectory layout and
//! attached metadata, described by [`WorkspaceKind`] and [`WorkspaceDetails`].
//!
//! An active workspace holds an exclusive lock on
//! [`LOCK_FILENAME`](stage_fs::LOCK_FILENAME) in its root, which tells purges
//! in other processes sharing the cache root that the directory is in use.

mod file_info;

pub use file_info::{FileInfo, SkipReason};

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use stage_bundle::ExtensionManifest;
use stage_fs::{LOCK_FILENAME, WorkspaceDir};

use crate::container::Registry;
use crate::{Error, Result};

/// The workspace variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceKind {
    Importer,
    Exporter,
    Editor,
}

impl WorkspaceKind {
    pub const ALL: [WorkspaceKind; 3] = [Self::Importer, Self::Exporter, Self::Editor];

    /// Subdirectories created under the workspace root by `mkdirs`.
    pub fn layout(self) -> &'static [WorkspaceDir] {
        match self {
            Self::Importer => &[WorkspaceDir::Input, WorkspaceDir::Output],
            Self::Exporter => &[WorkspaceDir::Package],
            Self::Editor => &[WorkspaceDir::Contents],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Importer => "importer",
            Self::Exporter => "exporter",
            Self::Editor => "editor",
        }
    }
}

impl std::fmt::Display for WorkspaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum WorkspaceState {
    Uninitialized = 0,
    Active = 1,
    Disposed = 2,
}

impl WorkspaceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Active,
            _ => Self::Disposed,
        }
    }
}

/// Metadata attached to each workspace kind.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceDetails {
    Importer {
        /// Populated once, after every input is staged
        input_file_infos: Vec<FileInfo>,
    },
    Exporter {
        manifest: Option<ExtensionManifest>,
        archive: Option<PathBuf>,
    },
    Editor {
        manifest: Option<ExtensionManifest>,
        /// Bundle the contents were unpacked from
        source: Option<PathBuf>,
    },
}

impl WorkspaceDetails {
    fn empty(kind: WorkspaceKind) -> Self {
        match kind {
            WorkspaceKind::Importer => Self::Importer {
                input_file_infos: Vec::new(),
            },
            WorkspaceKind::Exporter => Self::Exporter {
                manifest: None,
                archive: None,
            },
            WorkspaceKind::Editor => Self::Editor {
                manifest: None,
                source: None,
            },
        }
    }
}

/// A disposable unit of work owning one directory subtree.
///
/// Workspaces are created through
/// [`WorkspacesContainer::create`](crate::WorkspacesContainer::create),
/// populated while still exclusively owned, and then registered, after which
/// they are shared as `Arc<Workspace>`.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    kind: WorkspaceKind,
    root: PathBuf,
    created_at: DateTime<Utc>,
    state: AtomicU8,
    /// Ownership lock, held from `mkdirs` until `dispose`
    lock: Mutex<Option<File>>,
    registry: Weak<Registry>,
    details: WorkspaceDetails,
}

impl Workspace {
    /// Allocate a workspace rooted at `container_root/<id>`. No I/O.
    pub(crate) fn new(
        id: String,
        kind: WorkspaceKind,
        container_root: &Path,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            root: container_root.join(&id),
            id,
            kind,
            created_at: Utc::now(),
            state: AtomicU8::new(WorkspaceState::Uninitialized as u8),
            lock: Mutex::new(None),
            registry,
            details: WorkspaceDetails::empty(kind),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> WorkspaceKind {
        self.kind
    }

    pub fn root_directory(&self) -> &Path {
        &self.root
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> WorkspaceState {
        WorkspaceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkspaceState::Active
    }

    pub fn details(&self) -> &WorkspaceDetails {
        &self.details
    }

    /// Path of a layout subdirectory, if this kind has it.
    pub fn subdirectory(&self, dir: WorkspaceDir) -> Option<PathBuf> {
        self.kind
            .layout()
            .contains(&dir)
            .then(|| self.root.join(dir))
    }

    pub fn input_directory(&self) -> Option<PathBuf> {
        self.subdirectory(WorkspaceDir::Input)
    }

    pub fn output_directory(&self) -> Option<PathBuf> {
        self.subdirectory(WorkspaceDir::Output)
    }

    pub fn package_directory(&self) -> Option<PathBuf> {
        self.subdirectory(WorkspaceDir::Package)
    }

    pub fn contents_directory(&self) -> Option<PathBuf> {
        self.subdirectory(WorkspaceDir::Contents)
    }

    /// Staged items of an importer workspace; empty for other kinds and
    /// before staging finished.
    pub fn input_file_infos(&self) -> &[FileInfo] {
        match &self.details {
            WorkspaceDetails::Importer { input_file_infos } => input_file_infos,
            _ => &[],
        }
    }

    /// Manifest attached to an exporter or editor workspace.
    pub fn manifest(&self) -> Option<&ExtensionManifest> {
        match &self.details {
            WorkspaceDetails::Exporter { manifest, .. }
            | WorkspaceDetails::Editor { manifest, .. } => manifest.as_ref(),
            WorkspaceDetails::Importer { .. } => None,
        }
    }

    /// Archive produced by an exporter workspace.
    pub fn archive_path(&self) -> Option<&Path> {
        match &self.details {
            WorkspaceDetails::Exporter { archive, .. } => archive.as_deref(),
            _ => None,
        }
    }

    /// Bundle an editor workspace was opened from.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.details {
            WorkspaceDetails::Editor { source, .. } => source.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn set_input_file_infos(&mut self, infos: Vec<FileInfo>) {
        if let WorkspaceDetails::Importer { input_file_infos } = &mut self.details {
            *input_file_infos = infos;
        }
    }

    pub(crate) fn set_manifest(&mut self, value: ExtensionManifest) {
        match &mut self.details {
            WorkspaceDetails::Exporter { manifest, .. }
            | WorkspaceDetails::Editor { manifest, .. } => *manifest = Some(value),
            WorkspaceDetails::Importer { .. } => {}
        }
    }

    pub(crate) fn set_archive(&mut self, path: PathBuf) {
        if let WorkspaceDetails::Exporter { archive, .. } = &mut self.details {
            *archive = Some(path);
        }
    }

    pub(crate) fn set_source(&mut self, path: PathBuf) {
        if let WorkspaceDetails::Editor { source, .. } = &mut self.details {
            *source = Some(path);
        }
    }

    /// Whether the ownership lock is currently held by this workspace.
    pub fn holds_lock(&self) -> bool {
        self.lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn belongs_to(&self, registry: &std::sync::Arc<Registry>) -> bool {
        std::ptr::eq(self.registry.as_ptr(), std::sync::Arc::as_ptr(registry))
    }

    /// Create the root directory and the kind's subdirectories, and take
    /// the ownership lock.
    ///
    /// Parents are created as needed and existing directories are accepted,
    /// so calling this twice is harmless.
    pub async fn mkdirs(&self) -> Result<()> {
        if self.state() == WorkspaceState::Disposed {
            return Err(Error::Disposed {
                id: self.id.clone(),
            });
        }

        create_dir(&self.root).await?;
        if !self.holds_lock() {
            let path = self.root.join(LOCK_FILENAME);
            let file =
                tokio::task::spawn_blocking(move || stage_fs::io::lock_exclusive(&path)).await??;
            *self.lock.lock().unwrap_or_else(PoisonError::into_inner) = Some(file);
        }
        for dir in self.kind.layout() {
            create_dir(&self.root.join(dir)).await?;
        }

        // A concurrent dispose wins; the directories it missed are purged later
        let _ = self.state.compare_exchange(
            WorkspaceState::Uninitialized as u8,
            WorkspaceState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        tracing::debug!(id = %self.id, kind = %self.kind, root = %self.root.display(), "Workspace directories created");
        Ok(())
    }

    /// Deregister from the owning container and delete the directory tree.
    ///
    /// The workspace is marked disposed first, then removed from the
    /// registry, then deleted from disk, so a lookup can never return a
    /// workspace whose directory is already gone. Calling this again, or on
    /// a workspace whose directories were never created, is a no-op.
    pub async fn dispose(&self) -> Result<()> {
        let previous = self
            .state
            .swap(WorkspaceState::Disposed as u8, Ordering::AcqRel);
        if WorkspaceState::from_u8(previous) == WorkspaceState::Disposed {
            return Ok(());
        }

        if let Some(registry) = self.registry.upgrade() {
            let _released = registry.lock().await.release(&self.id);
        }
        // Closed before deletion so no open handle pins the directory
        drop(self.lock.lock().unwrap_or_else(PoisonError::into_inner).take());

        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "Failed to delete workspace directory");
                return Err(stage_fs::Error::io(&self.root, e).into());
            }
        }

        tracing::info!(id = %self.id, kind = %self.kind, "Workspace disposed");
        Ok(())
    }

    /// Dispose a workspace whose construction failed with `cause`.
    ///
    /// Cleanup failures are logged so they never mask the original error.
    pub(crate) async fn abandon(&self, cause: &Error) {
        tracing::warn!(id = %self.id, kind = %self.kind, error = %cause, "Abandoning workspace");
        if let Err(e) = self.dispose().await {
            tracing::warn!(id = %self.id, error = %e, "Cleanup of abandoned workspace failed");
        }
    }
}

impl Drop for Workspace {
    /// Release the id reservation of a workspace that was never registered
    /// or disposed, so `purge_stale` can reclaim its directory.
    fn drop(&mut self) {
        if self.state() == WorkspaceState::Disposed {
            return;
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if let Ok(mut entries) = registry.try_lock() {
            entries.release_reservation(&self.id);
            return;
        }

        let id = self.id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    registry.lock().await.release_reservation(&id);
                });
            }
            Err(_) => registry.blocking_lock().release_reservation(&id),
        }
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| Error::DirectoryCreation {
            path: path.to_path_buf(),
            source,
        })
}

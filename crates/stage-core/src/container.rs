//! Concurrency-safe registry of live workspaces of one kind
//!
//! Every container owns a root directory and a single async mutex guarding
//! its map of live workspaces. The lock is only ever held while mutating or
//! reading the in-memory map; no filesystem I/O happens under it.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stage_fs::io::LockState;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::workspace::{Workspace, WorkspaceKind, WorkspaceState};
use crate::{Error, Result};

/// How long a directory without a lock file is left alone by `purge_stale`.
///
/// Covers the moment between another process creating a workspace root and
/// taking its lock.
const UNLOCKED_GRACE: Duration = Duration::from_secs(60);

/// Map state shared by a container and the workspaces it created.
#[derive(Debug, Default)]
pub(crate) struct Entries {
    live: HashMap<String, Arc<Workspace>>,
    /// Created but not yet registered; protected from `purge_stale`
    reserved: HashSet<String>,
}

impl Entries {
    /// Forget `id` entirely, handing back the live entry if there was one.
    ///
    /// The caller drops the returned handle after releasing the lock.
    pub(crate) fn release(&mut self, id: &str) -> Option<Arc<Workspace>> {
        self.reserved.remove(id);
        self.live.remove(id)
    }

    pub(crate) fn release_reservation(&mut self, id: &str) {
        self.reserved.remove(id);
    }

    fn is_known(&self, id: &str) -> bool {
        self.live.contains_key(id) || self.reserved.contains(id)
    }
}

pub(crate) type Registry = Mutex<Entries>;

/// Outcome of [`WorkspacesContainer::purge_stale`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Registry of the live workspaces of one [`WorkspaceKind`].
///
/// Cloning creates another handle to the same registry.
#[derive(Debug, Clone)]
pub struct WorkspacesContainer {
    kind: WorkspaceKind,
    root: PathBuf,
    entries: Arc<Registry>,
}

impl WorkspacesContainer {
    pub fn new(kind: WorkspaceKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
            entries: Arc::new(Mutex::new(Entries::default())),
        }
    }

    pub fn kind(&self) -> WorkspaceKind {
        self.kind
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a workspace with a fresh identifier, bound to this container.
    ///
    /// Nothing is written to disk until [`Workspace::mkdirs`].
    pub async fn create(&self) -> Workspace {
        self.create_with_id(Uuid::new_v4().to_string()).await
    }

    /// Allocate a workspace with a caller-chosen identifier.
    pub async fn create_with_id(&self, id: impl Into<String>) -> Workspace {
        let id = id.into();
        self.entries.lock().await.reserved.insert(id.clone());
        tracing::debug!(id = %id, kind = %self.kind, "Workspace allocated");
        Workspace::new(id, self.kind, &self.root, Arc::downgrade(&self.entries))
    }

    /// Register a workspace and return the shared handle.
    ///
    /// A workspace rejected for any reason but a duplicate id is disposed,
    /// since the caller no longer owns it. A duplicate shares its directory
    /// with the registered workspace and is only dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::Disposed`] for a workspace that was already disposed
    /// - [`Error::KindMismatch`] for a workspace of another kind
    /// - [`Error::ForeignWorkspace`] for a workspace created by another container
    /// - [`Error::DuplicateIdentifier`] when the id is already registered
    pub async fn add(&self, workspace: Workspace) -> Result<Arc<Workspace>> {
        if let Err(e) = self.check_admissible(&workspace) {
            workspace.abandon(&e).await;
            return Err(e);
        }

        let workspace = Arc::new(workspace);
        let mut entries = self.entries.lock().await;
        if entries.live.contains_key(workspace.id()) {
            drop(entries);
            tracing::error!(id = %workspace.id(), kind = %self.kind, "Duplicate workspace identifier");
            return Err(Error::DuplicateIdentifier {
                id: workspace.id().to_string(),
            });
        }
        entries.reserved.remove(workspace.id());
        entries
            .live
            .insert(workspace.id().to_string(), Arc::clone(&workspace));
        drop(entries);

        tracing::info!(id = %workspace.id(), kind = %self.kind, "Workspace registered");
        Ok(workspace)
    }

    fn check_admissible(&self, workspace: &Workspace) -> Result<()> {
        if workspace.state() == WorkspaceState::Disposed {
            return Err(Error::Disposed {
                id: workspace.id().to_string(),
            });
        }
        if workspace.kind() != self.kind {
            return Err(Error::KindMismatch {
                expected: self.kind,
                actual: workspace.kind(),
            });
        }
        if !workspace.belongs_to(&self.entries) {
            return Err(Error::ForeignWorkspace {
                id: workspace.id().to_string(),
            });
        }
        Ok(())
    }

    /// Unregister a workspace. Absent workspaces are ignored.
    ///
    /// Returns whether an entry was removed.
    pub async fn remove(&self, workspace: &Workspace) -> bool {
        self.remove_by_id(workspace.id()).await
    }

    pub async fn remove_by_id(&self, id: &str) -> bool {
        let released = self.entries.lock().await.release(id);
        released.is_some()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<Arc<Workspace>> {
        self.entries.lock().await.live.get(id).cloned()
    }

    /// Synchronous lookup for callers outside the async runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context.
    pub fn blocking_find_by_id(&self, id: &str) -> Option<Arc<Workspace>> {
        self.entries.blocking_lock().live.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.live.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Identifiers of all registered workspaces, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().await.live.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Dispose every registered workspace.
    ///
    /// Keeps going past individual failures and returns the first one.
    pub async fn dispose_all(&self) -> Result<()> {
        let workspaces: Vec<Arc<Workspace>> =
            self.entries.lock().await.live.values().cloned().collect();

        let mut first_error = None;
        for workspace in workspaces {
            if let Err(e) = workspace.dispose().await {
                tracing::warn!(id = %workspace.id(), error = %e, "Failed to dispose workspace");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Delete directories under the container root that no workspace owns.
    ///
    /// Such directories are left behind by crashed processes or by disposals
    /// whose deletion failed. Workspaces that are allocated but not yet
    /// registered are kept, and so is any directory whose lock another
    /// process still holds. A missing root is not an error.
    pub async fn purge_stale(&self) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(stage_fs::Error::io(&self.root, e).into()),
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| stage_fs::Error::io(&self.root, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            // Checked per entry so workspaces allocated mid-scan are kept
            if !is_dir || self.entries.lock().await.is_known(&name) {
                continue;
            }

            let path = entry.path();
            if !is_abandoned(&path).await {
                tracing::debug!(path = %path.display(), "Keeping workspace directory in use elsewhere");
                continue;
            }
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => report.removed.push(path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to purge stale workspace");
                    report.failed.push(path);
                }
            }
        }

        if !report.removed.is_empty() {
            tracing::info!(
                kind = %self.kind,
                removed = report.removed.len(),
                "Purged stale workspace directories"
            );
        }
        Ok(report)
    }
}

/// Whether no process owns `dir`: its lock file can be taken, or it has
/// none and has not changed for [`UNLOCKED_GRACE`].
async fn is_abandoned(dir: &Path) -> bool {
    let lock_path = dir.join(stage_fs::LOCK_FILENAME);
    let state = tokio::task::spawn_blocking(move || stage_fs::io::lock_state(&lock_path)).await;
    match state {
        Ok(Ok(LockState::Free)) => true,
        Ok(Ok(LockState::Held)) => false,
        Ok(Ok(LockState::Missing)) => tokio::fs::metadata(dir)
            .await
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age >= UNLOCKED_GRACE),
        Ok(Err(e)) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to check workspace lock");
            false
        }
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Workspace lock check did not finish");
            false
        }
    }
}

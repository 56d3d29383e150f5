//! Editor sessions
//!
//! An editor workspace holds the unpacked contents of one bundle so they can
//! be changed in place and packed again.

use std::path::Path;
use std::sync::Arc;

use stage_bundle::{ArchiveExtractor, ExtensionManifest, ManifestDecoder, locate_manifest, pack_directory};

use crate::container::WorkspacesContainer;
use crate::workspace::{Workspace, WorkspaceKind, WorkspaceState};
use crate::{Error, Result};

/// Opens and saves bundles in the editor container.
#[derive(Clone)]
pub struct EditorPipeline {
    container: WorkspacesContainer,
    extractor: Arc<dyn ArchiveExtractor>,
    decoder: Arc<dyn ManifestDecoder>,
    manifest_file_name: String,
}

impl std::fmt::Debug for EditorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorPipeline")
            .field("container", &self.container)
            .field("manifest_file_name", &self.manifest_file_name)
            .finish_non_exhaustive()
    }
}

impl EditorPipeline {
    pub fn new(
        container: WorkspacesContainer,
        extractor: Arc<dyn ArchiveExtractor>,
        decoder: Arc<dyn ManifestDecoder>,
        manifest_file_name: impl Into<String>,
    ) -> Self {
        debug_assert_eq!(container.kind(), WorkspaceKind::Editor);
        Self {
            container,
            extractor,
            decoder,
            manifest_file_name: manifest_file_name.into(),
        }
    }

    /// Unpack `bundle` into a new editor workspace.
    ///
    /// Unlike import, a bundle without a readable manifest cannot be edited,
    /// so every extraction or decode failure is returned.
    pub async fn open(&self, bundle: &Path) -> Result<Arc<Workspace>> {
        let mut workspace = self.container.create().await;
        tracing::info!(id = %workspace.id(), bundle = %bundle.display(), "Opening bundle for editing");

        let unpacked = match workspace.mkdirs().await {
            Ok(()) => self.unpack(&workspace, bundle).await,
            Err(e) => Err(e),
        };
        let manifest = match unpacked {
            Ok(manifest) => manifest,
            Err(e) => {
                workspace.abandon(&e).await;
                return Err(e);
            }
        };

        workspace.set_manifest(manifest);
        workspace.set_source(bundle.to_path_buf());
        self.container.add(workspace).await
    }

    /// Pack the current contents of an editor workspace into `destination`.
    ///
    /// Returns the number of files written.
    pub async fn save(&self, workspace: &Workspace, destination: &Path) -> Result<usize> {
        if workspace.state() == WorkspaceState::Disposed {
            return Err(Error::Disposed {
                id: workspace.id().to_string(),
            });
        }
        let contents = workspace.contents_directory().ok_or(Error::KindMismatch {
            expected: WorkspaceKind::Editor,
            actual: workspace.kind(),
        })?;
        let decoder = Arc::clone(&self.decoder);
        let manifest_file_name = self.manifest_file_name.clone();
        let archive = destination.to_path_buf();

        let files = tokio::task::spawn_blocking(move || -> Result<usize> {
            // Refuse to write a bundle that could not be opened again
            decode_contents(decoder.as_ref(), &contents, &manifest_file_name)?;
            Ok(pack_directory(&contents, &archive)?)
        })
        .await??;

        tracing::info!(id = %workspace.id(), archive = %destination.display(), files, "Saved bundle");
        Ok(files)
    }

    async fn unpack(&self, workspace: &Workspace, bundle: &Path) -> Result<ExtensionManifest> {
        let contents = workspace.contents_directory().ok_or(Error::KindMismatch {
            expected: WorkspaceKind::Editor,
            actual: workspace.kind(),
        })?;
        let extractor = Arc::clone(&self.extractor);
        let decoder = Arc::clone(&self.decoder);
        let manifest_file_name = self.manifest_file_name.clone();
        let bundle = bundle.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<ExtensionManifest> {
            let report = extractor.extract(&bundle, &contents)?;
            tracing::debug!(files = report.files, directories = report.directories, "Extracted bundle");
            decode_contents(decoder.as_ref(), &contents, &manifest_file_name)
        })
        .await?
    }
}

fn decode_contents(
    decoder: &dyn ManifestDecoder,
    contents: &Path,
    manifest_file_name: &str,
) -> Result<ExtensionManifest> {
    let path = locate_manifest(contents, manifest_file_name).ok_or_else(|| {
        stage_bundle::Error::ManifestNotFound(contents.join(manifest_file_name))
    })?;
    Ok(decoder.decode(&path)?)
}

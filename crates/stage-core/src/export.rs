//! Export pipeline
//!
//! Assembles a bundle from a source directory and a manifest inside an
//! exporter workspace and packs it into a zip archive.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stage_bundle::{ExtensionManifest, ManifestDecoder, pack_directory};
use stage_fs::NormalizedPath;

use crate::container::WorkspacesContainer;
use crate::workspace::{Workspace, WorkspaceKind};
use crate::{Error, Result};

/// Builds bundles in the exporter container.
#[derive(Clone)]
pub struct ExportPipeline {
    container: WorkspacesContainer,
    decoder: Arc<dyn ManifestDecoder>,
    manifest_file_name: String,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("container", &self.container)
            .field("manifest_file_name", &self.manifest_file_name)
            .finish_non_exhaustive()
    }
}

impl ExportPipeline {
    pub fn new(
        container: WorkspacesContainer,
        decoder: Arc<dyn ManifestDecoder>,
        manifest_file_name: impl Into<String>,
    ) -> Self {
        debug_assert_eq!(container.kind(), WorkspaceKind::Exporter);
        Self {
            container,
            decoder,
            manifest_file_name: manifest_file_name.into(),
        }
    }

    /// Package `source` with `manifest` into a zip archive at `destination`.
    ///
    /// The manifest is validated before anything touches the disk and
    /// decoded back from the package before packing. Any failure disposes
    /// the workspace.
    pub async fn run(
        &self,
        manifest: &ExtensionManifest,
        source: &Path,
        destination: &Path,
    ) -> Result<Arc<Workspace>> {
        manifest.validate()?;

        let mut workspace = self.container.create().await;
        tracing::info!(
            id = %workspace.id(),
            extension = %manifest.extension.name,
            source = %source.display(),
            "Starting export"
        );

        let packed = match workspace.mkdirs().await {
            Ok(()) => self.assemble(&workspace, manifest, source, destination).await,
            Err(e) => Err(e),
        };
        let decoded = match packed {
            Ok(decoded) => decoded,
            Err(e) => {
                workspace.abandon(&e).await;
                return Err(e);
            }
        };

        workspace.set_manifest(decoded);
        workspace.set_archive(destination.to_path_buf());
        let workspace = self.container.add(workspace).await?;
        tracing::info!(id = %workspace.id(), archive = %destination.display(), "Export complete");
        Ok(workspace)
    }

    async fn assemble(
        &self,
        workspace: &Workspace,
        manifest: &ExtensionManifest,
        source: &Path,
        destination: &Path,
    ) -> Result<ExtensionManifest> {
        let package = workspace.package_directory().ok_or(Error::KindMismatch {
            expected: WorkspaceKind::Exporter,
            actual: workspace.kind(),
        })?;
        let content = manifest.to_json()?;
        let decoder = Arc::clone(&self.decoder);
        let manifest_path = package.join(&self.manifest_file_name);
        let source = source.to_path_buf();
        let destination: PathBuf = destination.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<ExtensionManifest> {
            let copied = stage_fs::io::copy_dir_all(&source, &package)?;
            stage_fs::io::write_atomic(&NormalizedPath::new(&manifest_path), content.as_bytes())?;
            let decoded = decoder.decode(&manifest_path)?;
            let files = pack_directory(&package, &destination)?;
            tracing::debug!(copied, files, archive = %destination.display(), "Packed export");
            Ok(decoded)
        })
        .await?
    }
}

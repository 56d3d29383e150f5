//! Import pipeline
//!
//! Turns a list of locators into one fully populated importer workspace.
//! Metadata and staging failures abort the whole request; anything that
//! goes wrong while interpreting a staged item is recorded on its
//! [`FileInfo`] instead.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stage_bundle::{
    ArchiveExtractor, ExtensionManifest, JsonManifestDecoder, MANIFEST_FILENAME, ManifestDecoder,
    MediaTypeClassifier, SniffingClassifier, ZipExtractor, locate_manifest,
};
use stage_fs::{sanitize_file_name, unique_file_name};

use crate::container::WorkspacesContainer;
use crate::resolver::{FileResolver, Locator, ResourceResolver};
use crate::workspace::{FileInfo, SkipReason, Workspace, WorkspaceKind};
use crate::{Error, Result};

/// The pluggable services the pipelines depend on.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn ResourceResolver>,
    pub classifier: Arc<dyn MediaTypeClassifier>,
    pub extractor: Arc<dyn ArchiveExtractor>,
    pub decoder: Arc<dyn ManifestDecoder>,
    /// File name searched for inside extracted archives
    pub manifest_file_name: String,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            resolver: Arc::new(FileResolver),
            classifier: Arc::new(SniffingClassifier),
            extractor: Arc::new(ZipExtractor::new()),
            decoder: Arc::new(JsonManifestDecoder),
            manifest_file_name: MANIFEST_FILENAME.to_string(),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("manifest_file_name", &self.manifest_file_name)
            .finish_non_exhaustive()
    }
}

/// Result of interpreting one staged file.
struct Interpretation {
    media_type: Option<String>,
    checksum: Option<String>,
    extracted_directory: Option<PathBuf>,
    manifest: Option<ExtensionManifest>,
    skip_reason: SkipReason,
}

/// Orchestrates one import request against the importer container.
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    container: WorkspacesContainer,
    collaborators: Collaborators,
}

impl ImportPipeline {
    /// # Panics
    ///
    /// Debug builds assert that `container` holds importer workspaces.
    pub fn new(container: WorkspacesContainer, collaborators: Collaborators) -> Self {
        debug_assert_eq!(container.kind(), WorkspaceKind::Importer);
        Self {
            container,
            collaborators,
        }
    }

    /// Run the import and return the registered workspace.
    ///
    /// On a fatal error the partially built workspace is disposed before the
    /// error is returned, so nothing is registered and nothing stays on disk.
    pub async fn run(&self, locators: &[Locator]) -> Result<Arc<Workspace>> {
        if locators.is_empty() {
            return Err(Error::NoLocators);
        }

        let mut workspace = self.container.create().await;
        tracing::info!(id = %workspace.id(), items = locators.len(), "Starting import");

        let staged = match workspace.mkdirs().await {
            Ok(()) => self.stage_all(&workspace, locators).await,
            Err(e) => Err(e),
        };
        let infos = match staged {
            Ok(infos) => infos,
            Err(e) => {
                workspace.abandon(&e).await;
                return Err(e);
            }
        };

        let decoded = infos.iter().filter(|i| i.has_manifest()).count();
        workspace.set_input_file_infos(infos);
        let workspace = self.container.add(workspace).await?;

        tracing::info!(
            id = %workspace.id(),
            items = locators.len(),
            decoded,
            "Import complete"
        );
        Ok(workspace)
    }

    async fn stage_all(&self, workspace: &Workspace, locators: &[Locator]) -> Result<Vec<FileInfo>> {
        let (Some(input_dir), Some(output_dir)) =
            (workspace.input_directory(), workspace.output_directory())
        else {
            return Err(Error::KindMismatch {
                expected: WorkspaceKind::Importer,
                actual: workspace.kind(),
            });
        };

        let mut used_names = HashSet::new();
        let mut infos = Vec::with_capacity(locators.len());
        for (index, locator) in locators.iter().enumerate() {
            let info = self
                .stage_one(index, locator, &input_dir, &output_dir, &mut used_names)
                .await?;
            infos.push(info);
        }
        Ok(infos)
    }

    async fn stage_one(
        &self,
        index: usize,
        locator: &Locator,
        input_dir: &Path,
        output_dir: &Path,
        used_names: &mut HashSet<String>,
    ) -> Result<FileInfo> {
        let metadata = self
            .collaborators
            .resolver
            .metadata(locator)
            .await
            .map_err(|source| Error::ResourceMetadataUnavailable {
                locator: locator.to_string(),
                source,
            })?;

        let base_name = sanitize_file_name(&metadata.display_name).unwrap_or_else(|_| {
            tracing::debug!(locator = %locator, name = %metadata.display_name, "Unusable display name");
            format!("item-{index}")
        });
        let file_name = unique_file_name(&base_name, |candidate| used_names.contains(candidate));
        if file_name != base_name {
            tracing::debug!(locator = %locator, from = %base_name, to = %file_name, "Renamed duplicate display name");
        }
        used_names.insert(file_name.clone());

        let staged_path = input_dir.join(&file_name);
        let written = self
            .collaborators
            .resolver
            .stage(locator, &staged_path)
            .await
            .map_err(|source| Error::Staging {
                locator: locator.to_string(),
                source,
            })?;
        tracing::debug!(locator = %locator, file = %staged_path.display(), bytes = written, "Staged item");

        let extract_dir = output_dir.join(format!("{index}-{}", file_stem(&file_name)));
        let interpretation = {
            let collaborators = self.collaborators.clone();
            let staged_path = staged_path.clone();
            let hint = metadata.content_type.clone();
            tokio::task::spawn_blocking(move || {
                interpret(&collaborators, &staged_path, hint.as_deref(), &extract_dir)
            })
            .await?
        };

        let mut info = FileInfo::staged(
            staged_path,
            metadata.display_name,
            metadata.size.unwrap_or(written),
        );
        info.media_type = interpretation.media_type;
        info.checksum = interpretation.checksum;
        info.extracted_directory = interpretation.extracted_directory;
        info.manifest = interpretation.manifest;
        info.skip_reason = interpretation.skip_reason;
        Ok(info)
    }
}

/// Classify, fingerprint, extract and decode one staged file. Never fails.
fn interpret(
    collaborators: &Collaborators,
    staged: &Path,
    hint: Option<&str>,
    extract_dir: &Path,
) -> Interpretation {
    let media_type = collaborators.classifier.classify(staged, hint);
    let checksum = stage_fs::checksum::compute_file_checksum(staged)
        .map_err(|e| tracing::debug!(file = %staged.display(), error = %e, "Checksum failed"))
        .ok();

    let mut interpretation = Interpretation {
        media_type,
        checksum,
        extracted_directory: None,
        manifest: None,
        skip_reason: SkipReason::None,
    };

    if let Err(e) = collaborators.extractor.extract(staged, extract_dir) {
        interpretation.skip_reason = SkipReason::from_error(&e);
        log_skip(staged, interpretation.skip_reason, &e);
        if let Err(cleanup) = stage_fs::io::remove_dir_all_if_exists(extract_dir) {
            tracing::debug!(dir = %extract_dir.display(), error = %cleanup, "Partial extraction left behind");
        }
        return interpretation;
    }
    interpretation.extracted_directory = Some(extract_dir.to_path_buf());

    let decoded = locate_manifest(extract_dir, &collaborators.manifest_file_name)
        .ok_or_else(|| stage_bundle::Error::ManifestNotFound(extract_dir.join(&collaborators.manifest_file_name)))
        .and_then(|path| collaborators.decoder.decode(&path));
    match decoded {
        Ok(manifest) => interpretation.manifest = Some(manifest),
        Err(e) => {
            interpretation.skip_reason = SkipReason::from_error(&e);
            log_skip(staged, interpretation.skip_reason, &e);
        }
    }
    interpretation
}

fn log_skip(staged: &Path, reason: SkipReason, err: &stage_bundle::Error) {
    // Plain files are expected in a batch; everything else is worth a warning
    if reason == SkipReason::NotAnArchive {
        tracing::debug!(file = %staged.display(), "Not an archive, skipping decode");
    } else {
        tracing::warn!(file = %staged.display(), reason = %reason, error = %err, "Could not decode item");
    }
}

fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

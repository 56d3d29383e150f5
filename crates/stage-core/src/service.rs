//! The [`Workspaces`] service
//!
//! Owns one container per workspace kind plus the collaborators the
//! pipelines use, and is the entry point for callers that do not need to
//! wire containers and pipelines themselves.

use std::path::Path;
use std::sync::Arc;

use stage_bundle::{
    ArchiveExtractor, ExtensionManifest, JsonManifestDecoder, ManifestDecoder,
    MediaTypeClassifier, SniffingClassifier, ZipExtractor,
};
use tokio::task::JoinHandle;

use crate::config::StageConfig;
use crate::container::{PurgeReport, WorkspacesContainer};
use crate::editor::EditorPipeline;
use crate::export::ExportPipeline;
use crate::import::{Collaborators, ImportPipeline};
use crate::resolver::{FileResolver, Locator, ResourceResolver};
use crate::workspace::{Workspace, WorkspaceKind};
use crate::Result;

#[derive(Debug)]
struct Inner {
    config: StageConfig,
    importers: WorkspacesContainer,
    exporters: WorkspacesContainer,
    editors: WorkspacesContainer,
    import: ImportPipeline,
    export: ExportPipeline,
    editor: EditorPipeline,
}

/// Shared handle to the workspace containers and pipelines.
///
/// Cloning is cheap; every clone talks to the same containers.
#[derive(Debug, Clone)]
pub struct Workspaces {
    inner: Arc<Inner>,
}

impl Workspaces {
    pub fn builder() -> WorkspacesBuilder {
        WorkspacesBuilder::default()
    }

    /// Build a service with the default collaborators. No I/O.
    pub fn from_config(config: StageConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Build a service and, when configured to, purge directories left
    /// behind by earlier processes.
    pub async fn open(config: StageConfig) -> Result<Self> {
        let workspaces = Self::from_config(config);
        if workspaces.inner.config.purge_on_start {
            workspaces.purge_stale().await?;
        }
        Ok(workspaces)
    }

    pub fn config(&self) -> &StageConfig {
        &self.inner.config
    }

    pub fn importers(&self) -> &WorkspacesContainer {
        &self.inner.importers
    }

    pub fn exporters(&self) -> &WorkspacesContainer {
        &self.inner.exporters
    }

    pub fn editors(&self) -> &WorkspacesContainer {
        &self.inner.editors
    }

    pub fn container(&self, kind: WorkspaceKind) -> &WorkspacesContainer {
        match kind {
            WorkspaceKind::Importer => self.importers(),
            WorkspaceKind::Exporter => self.exporters(),
            WorkspaceKind::Editor => self.editors(),
        }
    }

    /// Stage and interpret `locators` into a new importer workspace.
    pub async fn import(&self, locators: &[Locator]) -> Result<Arc<Workspace>> {
        self.inner.import.run(locators).await
    }

    /// Run an import as an independent task.
    ///
    /// Dropping the handle detaches the task; the import still runs to
    /// completion and its workspace stays registered.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn_import(&self, locators: Vec<Locator>) -> JoinHandle<Result<Arc<Workspace>>> {
        let pipeline = self.inner.import.clone();
        tokio::spawn(async move { pipeline.run(&locators).await })
    }

    /// Package `source` with `manifest` into a zip archive at `destination`.
    pub async fn export(
        &self,
        manifest: &ExtensionManifest,
        source: &Path,
        destination: &Path,
    ) -> Result<Arc<Workspace>> {
        self.inner.export.run(manifest, source, destination).await
    }

    /// Unpack a bundle into a new editor workspace.
    pub async fn open_editor(&self, bundle: &Path) -> Result<Arc<Workspace>> {
        self.inner.editor.open(bundle).await
    }

    /// Pack an editor workspace's contents into `destination`.
    pub async fn save_editor(&self, workspace: &Workspace, destination: &Path) -> Result<usize> {
        self.inner.editor.save(workspace, destination).await
    }

    pub async fn find(&self, kind: WorkspaceKind, id: &str) -> Option<Arc<Workspace>> {
        self.container(kind).find_by_id(id).await
    }

    pub async fn find_importer(&self, id: &str) -> Option<Arc<Workspace>> {
        self.importers().find_by_id(id).await
    }

    pub async fn find_exporter(&self, id: &str) -> Option<Arc<Workspace>> {
        self.exporters().find_by_id(id).await
    }

    pub async fn find_editor(&self, id: &str) -> Option<Arc<Workspace>> {
        self.editors().find_by_id(id).await
    }

    /// Purge orphaned directories in every container.
    pub async fn purge_stale(&self) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        for kind in WorkspaceKind::ALL {
            let partial = self.container(kind).purge_stale().await?;
            report.removed.extend(partial.removed);
            report.failed.extend(partial.failed);
        }
        Ok(report)
    }

    /// Dispose every registered workspace of every kind.
    ///
    /// All containers are drained even when one fails; the first error is
    /// returned.
    pub async fn shutdown(&self) -> Result<()> {
        let mut first_error = None;
        for kind in WorkspaceKind::ALL {
            if let Err(e) = self.container(kind).dispose_all().await {
                first_error.get_or_insert(e);
            }
        }
        tracing::info!("Workspaces shut down");
        first_error.map_or(Ok(()), Err)
    }
}

/// Builder for [`Workspaces`] with replaceable collaborators.
///
/// # Example
///
/// ```no_run
/// use stage_core::{StageConfig, Workspaces};
///
/// let workspaces = Workspaces::builder()
///     .config(StageConfig::with_cache_root("/tmp/stage"))
///     .build();
/// ```
#[derive(Default)]
pub struct WorkspacesBuilder {
    config: Option<StageConfig>,
    resolver: Option<Arc<dyn ResourceResolver>>,
    classifier: Option<Arc<dyn MediaTypeClassifier>>,
    extractor: Option<Arc<dyn ArchiveExtractor>>,
    decoder: Option<Arc<dyn ManifestDecoder>>,
}

impl WorkspacesBuilder {
    pub fn config(mut self, config: StageConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ResourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn MediaTypeClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn ManifestDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn build(self) -> Workspaces {
        let config = self.config.unwrap_or_default();
        let max_entries = config.max_archive_entries;
        let collaborators = Collaborators {
            resolver: self.resolver.unwrap_or_else(|| Arc::new(FileResolver)),
            classifier: self
                .classifier
                .unwrap_or_else(|| Arc::new(SniffingClassifier)),
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(ZipExtractor::with_max_entries(max_entries))),
            decoder: self
                .decoder
                .unwrap_or_else(|| Arc::new(JsonManifestDecoder)),
            manifest_file_name: config.manifest_file_name.clone(),
        };

        let importers = WorkspacesContainer::new(
            WorkspaceKind::Importer,
            config.container_root(WorkspaceKind::Importer),
        );
        let exporters = WorkspacesContainer::new(
            WorkspaceKind::Exporter,
            config.container_root(WorkspaceKind::Exporter),
        );
        let editors = WorkspacesContainer::new(
            WorkspaceKind::Editor,
            config.container_root(WorkspaceKind::Editor),
        );

        let export = ExportPipeline::new(
            exporters.clone(),
            Arc::clone(&collaborators.decoder),
            config.manifest_file_name.clone(),
        );
        let editor = EditorPipeline::new(
            editors.clone(),
            Arc::clone(&collaborators.extractor),
            Arc::clone(&collaborators.decoder),
            config.manifest_file_name.clone(),
        );
        let import = ImportPipeline::new(importers.clone(), collaborators);

        tracing::debug!(cache_root = %config.cache_root.display(), "Workspaces configured");
        Workspaces {
            inner: Arc::new(Inner {
                config,
                importers,
                exporters,
                editors,
                import,
                export,
                editor,
            }),
        }
    }
}

//! Import behaviour with substituted collaborators
//!
//! An in-memory resolver stands in for remote or sandboxed sources so that
//! declared metadata, hostile names and staging failures can be controlled.
//! A gated variant holds an import mid-flight while a second service shares
//! the cache root.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use stage_bundle::{ExtensionManifest, ManifestDecoder, MediaTypeClassifier};
use stage_core::{
    Error, Locator, ResolveError, ResourceMetadata, ResourceResolver, SkipReason, StageConfig,
    Workspaces,
};
use stage_test_utils::bundle;
use stage_test_utils::stage::TestStage;
use tokio::sync::Notify;

#[derive(Clone, Default)]
struct MemoryItem {
    display_name: String,
    bytes: Vec<u8>,
    content_type: Option<String>,
    declared_size: Option<u64>,
    fail_stage: bool,
}

#[derive(Default)]
struct MemoryResolver {
    items: HashMap<String, MemoryItem>,
}

impl MemoryResolver {
    fn with(mut self, locator: &str, item: MemoryItem) -> Self {
        self.items.insert(locator.to_string(), item);
        self
    }

    fn item(display_name: &str, bytes: &[u8]) -> MemoryItem {
        MemoryItem {
            display_name: display_name.to_string(),
            bytes: bytes.to_vec(),
            ..MemoryItem::default()
        }
    }

    fn lookup(&self, locator: &Locator) -> Result<&MemoryItem, ResolveError> {
        self.items
            .get(locator.as_str())
            .ok_or_else(|| ResolveError::unavailable(locator, "unknown locator"))
    }
}

#[async_trait]
impl ResourceResolver for MemoryResolver {
    async fn metadata(&self, locator: &Locator) -> Result<ResourceMetadata, ResolveError> {
        let item = self.lookup(locator)?;
        Ok(ResourceMetadata {
            display_name: item.display_name.clone(),
            size: item.declared_size,
            content_type: item.content_type.clone(),
        })
    }

    async fn stage(&self, locator: &Locator, destination: &Path) -> Result<u64, ResolveError> {
        let item = self.lookup(locator)?;
        if item.fail_stage {
            return Err(ResolveError::io(
                locator,
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "stream interrupted"),
            ));
        }
        tokio::fs::write(destination, &item.bytes)
            .await
            .map_err(|e| ResolveError::io(locator, e))?;
        Ok(item.bytes.len() as u64)
    }
}

/// Parks every `metadata` call until released, after announcing it.
struct GatedResolver {
    inner: MemoryResolver,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl ResourceResolver for GatedResolver {
    async fn metadata(&self, locator: &Locator) -> Result<ResourceMetadata, ResolveError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.metadata(locator).await
    }

    async fn stage(&self, locator: &Locator, destination: &Path) -> Result<u64, ResolveError> {
        self.inner.stage(locator, destination).await
    }
}

struct FixedClassifier;

impl MediaTypeClassifier for FixedClassifier {
    fn classify(&self, _file: &Path, _hint: Option<&str>) -> Option<String> {
        Some("application/x-fixed".to_string())
    }
}

struct RejectingDecoder;

impl ManifestDecoder for RejectingDecoder {
    fn decode(&self, _path: &Path) -> stage_bundle::Result<ExtensionManifest> {
        Err(stage_bundle::Error::InvalidName {
            name: "anything".to_string(),
            reason: "rejected by policy".to_string(),
        })
    }
}

fn service(stage: &TestStage, resolver: MemoryResolver) -> Workspaces {
    Workspaces::builder()
        .config(StageConfig::with_cache_root(stage.cache_root()))
        .resolver(Arc::new(resolver))
        .build()
}

fn bundle_bytes(stage: &TestStage) -> Vec<u8> {
    let path = stage.root().join("fixture.flex");
    bundle::write_bundle(&path, "sunset-pack", "1.2.0");
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn declared_metadata_feeds_classification_and_size() {
    let stage = TestStage::new();
    let resolver = MemoryResolver::default().with(
        "mem://photo",
        MemoryItem {
            content_type: Some("image/x-custom".to_string()),
            declared_size: Some(999),
            ..MemoryResolver::item("photo", &[0xff, 0xfe, 0x00, 0x81])
        },
    );
    let workspaces = service(&stage, resolver);

    let workspace = workspaces
        .import(&[Locator::new("mem://photo")])
        .await
        .unwrap();

    let info = &workspace.input_file_infos()[0];
    assert_eq!(info.media_type.as_deref(), Some("image/x-custom"));
    assert_eq!(info.size, 999);
    assert_eq!(std::fs::metadata(&info.file).unwrap().len(), 4);
}

#[tokio::test]
async fn hostile_display_names_stay_inside_input() {
    let stage = TestStage::new();
    let resolver = MemoryResolver::default()
        .with("mem://1", MemoryResolver::item("../../etc/passwd", b"x"))
        .with("mem://2", MemoryResolver::item("..", b"y"))
        .with("mem://3", MemoryResolver::item("passwd", b"z"));
    let workspaces = service(&stage, resolver);

    let workspace = workspaces
        .import(&[
            Locator::new("mem://1"),
            Locator::new("mem://2"),
            Locator::new("mem://3"),
        ])
        .await
        .unwrap();

    let input = workspace.input_directory().unwrap();
    let staged: Vec<_> = workspace
        .input_file_infos()
        .iter()
        .map(|info| info.file.clone())
        .collect();
    assert_eq!(
        staged,
        vec![
            input.join("passwd"),
            input.join("item-1"),
            input.join("passwd (1)"),
        ]
    );
    assert_eq!(workspace.input_file_infos()[0].display_name, "../../etc/passwd");
}

#[tokio::test]
async fn staging_failure_aborts_and_cleans_up() {
    let stage = TestStage::new();
    let resolver = MemoryResolver::default()
        .with("mem://ok", MemoryResolver::item("ok.txt", b"fine"))
        .with(
            "mem://broken",
            MemoryItem {
                fail_stage: true,
                ..MemoryResolver::item("broken.bin", b"")
            },
        );
    let workspaces = service(&stage, resolver);

    let err = workspaces
        .import(&[Locator::new("mem://ok"), Locator::new("mem://broken")])
        .await
        .unwrap_err();

    match err {
        Error::Staging { locator, .. } => assert_eq!(locator, "mem://broken"),
        other => panic!("expected staging error, got {other:?}"),
    }
    assert!(workspaces.importers().is_empty().await);
    stage.assert_dir_empty("cache/importer");
}

#[tokio::test]
async fn substituted_classifier_and_decoder_are_used() {
    let stage = TestStage::new();
    let bytes = bundle_bytes(&stage);
    let resolver = MemoryResolver::default().with("mem://bundle", MemoryResolver::item("a.flex", &bytes));
    let workspaces = Workspaces::builder()
        .config(StageConfig::with_cache_root(stage.cache_root()))
        .resolver(Arc::new(resolver))
        .classifier(Arc::new(FixedClassifier))
        .decoder(Arc::new(RejectingDecoder))
        .build();

    let workspace = workspaces
        .import(&[Locator::new("mem://bundle")])
        .await
        .unwrap();

    let info = &workspace.input_file_infos()[0];
    assert_eq!(info.media_type.as_deref(), Some("application/x-fixed"));
    assert_eq!(info.skip_reason, SkipReason::ManifestMalformed);
    assert!(info.manifest.is_none());
    assert!(info.extracted_directory.is_some());
}

#[tokio::test]
async fn entry_limit_from_config_is_enforced() {
    let stage = TestStage::new();
    let bytes = bundle_bytes(&stage);
    let resolver = MemoryResolver::default().with("mem://bundle", MemoryResolver::item("a.flex", &bytes));
    let mut config = StageConfig::with_cache_root(stage.cache_root());
    config.max_archive_entries = 1;
    let workspaces = Workspaces::builder()
        .config(config)
        .resolver(Arc::new(resolver))
        .build();

    let workspace = workspaces
        .import(&[Locator::new("mem://bundle")])
        .await
        .unwrap();

    let info = &workspace.input_file_infos()[0];
    assert_eq!(info.skip_reason, SkipReason::ExtractionFailed);
    assert!(info.extracted_directory.is_none());
    assert!(!workspace.output_directory().unwrap().join("0-a").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abandoned_spawned_import_still_completes() {
    let stage = TestStage::new();
    let resolver = MemoryResolver::default().with("mem://a", MemoryResolver::item("a.txt", b"a"));
    let workspaces = service(&stage, resolver);

    drop(workspaces.spawn_import(vec![Locator::new("mem://a")]));

    let mut registered = false;
    for _ in 0..100 {
        if workspaces.importers().len().await == 1 {
            registered = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(registered, "detached import never registered its workspace");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_service_leaves_import_in_progress_alone() {
    let stage = TestStage::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let resolver = GatedResolver {
        inner: MemoryResolver::default()
            .with("mem://slow", MemoryResolver::item("slow.txt", b"payload")),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    };
    let first = Workspaces::builder()
        .config(StageConfig::with_cache_root(stage.cache_root()))
        .resolver(Arc::new(resolver))
        .build();

    let pending = first.spawn_import(vec![Locator::new("mem://slow")]);
    entered.notified().await;
    assert_eq!(stage.count_entries("cache/importer"), 1);

    let second = Workspaces::open(StageConfig::with_cache_root(stage.cache_root()))
        .await
        .unwrap();
    let report = second.purge_stale().await.unwrap();
    assert!(report.removed.is_empty(), "purged {:?}", report.removed);

    release.notify_one();
    let workspace = pending.await.unwrap().unwrap();

    assert_eq!(workspace.input_file_infos().len(), 1);
    assert!(
        workspace
            .input_directory()
            .unwrap()
            .join("slow.txt")
            .is_file()
    );
    first.shutdown().await.unwrap();
    stage.assert_dir_empty("cache/importer");
}

//! End-to-end scenarios through the Workspaces service
//!
//! These exercise the default collaborators against real files: staging,
//! classification, extraction, manifest decoding, export and cleanup.

use pretty_assertions::assert_eq;
use stage_bundle::ExtensionManifest;
use stage_core::{Locator, SkipReason, StageConfig, WorkspaceKind, WorkspaceState, Workspaces};
use stage_fs::WorkspaceDir;
use stage_test_utils::stage::TestStage;

async fn open(stage: &TestStage) -> Workspaces {
    Workspaces::open(StageConfig::with_cache_root(stage.cache_root()))
        .await
        .unwrap()
}

#[tokio::test]
async fn import_bundle_and_plain_file_then_shutdown() {
    let stage = TestStage::new();
    let flex = stage.write_bundle("a.flex", "sunset-pack", "1.2.0");
    let text = stage.write_source("b.txt", "hello");
    let workspaces = open(&stage).await;

    let workspace = workspaces
        .import(&[
            Locator::from(flex.as_path()),
            Locator::new(format!("file://{}", text.display())),
        ])
        .await
        .unwrap();

    assert_eq!(workspace.kind(), WorkspaceKind::Importer);
    assert_eq!(workspace.state(), WorkspaceState::Active);
    let infos = workspace.input_file_infos();
    assert_eq!(infos.len(), 2);
    assert!(infos[0].has_manifest());
    assert_eq!(infos[1].skip_reason, SkipReason::NotAnArchive);

    let input = workspace.subdirectory(WorkspaceDir::Input).unwrap();
    assert!(input.join("a.flex").is_file());
    assert!(input.join("b.txt").is_file());
    let output = workspace.subdirectory(WorkspaceDir::Output).unwrap();
    assert_eq!(
        infos[0].extracted_directory.as_deref(),
        Some(output.join("0-a").as_path())
    );

    let root = workspace.root_directory().to_path_buf();
    workspaces.shutdown().await.unwrap();

    assert_eq!(workspace.state(), WorkspaceState::Disposed);
    assert!(!root.exists());
    assert!(workspaces.find_importer(workspace.id()).await.is_none());
}

#[tokio::test]
async fn exported_bundle_imports_with_same_manifest() {
    let stage = TestStage::new();
    stage.write_source("pack/brushes/soft.abr", "soft");
    stage.write_source("pack/presets/warm.json", "{}");
    let archive = stage.root().join("dist").join("sunset.flex");
    let workspaces = open(&stage).await;

    let mut manifest = ExtensionManifest::new("sunset-pack", "3.0.1");
    manifest.extension.author = Some("Studio".to_string());
    let exporter = workspaces
        .export(&manifest, &stage.sources().join("pack"), &archive)
        .await
        .unwrap();

    let importer = workspaces
        .import(&[Locator::from(archive.as_path())])
        .await
        .unwrap();

    let info = &importer.input_file_infos()[0];
    assert_eq!(info.media_type.as_deref(), Some("application/zip"));
    assert_eq!(info.manifest.as_ref(), Some(&manifest));
    assert_eq!(exporter.manifest(), Some(&manifest));

    exporter.dispose().await.unwrap();
    importer.dispose().await.unwrap();
    stage.assert_dir_empty("cache/exporter");
    stage.assert_dir_empty("cache/importer");
    assert!(archive.is_file());
}

#[tokio::test]
async fn reopening_purges_leftovers_but_keeps_nothing_live() {
    let stage = TestStage::new();
    let text = stage.write_source("b.txt", "hello");

    let kept_root = {
        let workspaces = open(&stage).await;
        let workspace = workspaces
            .import(&[Locator::from(text.as_path())])
            .await
            .unwrap();
        workspace.root_directory().to_path_buf()
    };
    assert!(kept_root.is_dir());

    let workspaces = open(&stage).await;

    assert!(!kept_root.exists());
    assert!(workspaces.importers().is_empty().await);
}

#[tokio::test]
async fn rapid_creations_do_not_share_directories() {
    let stage = TestStage::new();
    let workspaces = open(&stage).await;
    let container = workspaces.editors();

    let first = container.create().await;
    let second = container.create().await;
    first.mkdirs().await.unwrap();
    second.mkdirs().await.unwrap();

    assert_ne!(first.id(), second.id());
    assert_ne!(first.root_directory(), second.root_directory());
    assert!(!first.root_directory().starts_with(second.root_directory()));
    assert!(!second.root_directory().starts_with(first.root_directory()));

    first.dispose().await.unwrap();
    assert!(second.root_directory().is_dir());
    second.dispose().await.unwrap();
}

#[test]
fn blocking_lookup_from_synchronous_code() {
    let stage = TestStage::new();
    let text = stage.write_source("b.txt", "hello");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let workspaces = Workspaces::from_config(StageConfig::with_cache_root(stage.cache_root()));
    let id = runtime.block_on(async {
        let workspace = workspaces
            .import(&[Locator::from(text.as_path())])
            .await
            .unwrap();
        workspace.id().to_string()
    });

    let found = workspaces.importers().blocking_find_by_id(&id).unwrap();
    assert_eq!(found.input_file_infos().len(), 1);
    assert!(workspaces.importers().blocking_find_by_id("unknown").is_none());

    runtime.block_on(workspaces.shutdown()).unwrap();
}

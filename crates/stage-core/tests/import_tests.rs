//! Import pipeline tests against real files

use std::path::Path;

use pretty_assertions::assert_eq;
use stage_core::{Error, Locator, SkipReason, StageConfig, Workspaces};
use stage_test_utils::bundle;
use stage_test_utils::stage::TestStage;

fn service(stage: &TestStage) -> Workspaces {
    Workspaces::from_config(StageConfig::with_cache_root(stage.cache_root()))
}

fn locator(path: &Path) -> Locator {
    Locator::from(path)
}

#[tokio::test]
async fn import_bundle_and_text_file() {
    let stage = TestStage::new();
    let flex = stage.write_bundle("a.flex", "sunset-pack", "1.2.0");
    let text = stage.write_source("b.txt", "just some notes");
    let workspaces = service(&stage);

    let workspace = workspaces
        .import(&[locator(&flex), locator(&text)])
        .await
        .unwrap();

    let infos = workspace.input_file_infos();
    assert_eq!(infos.len(), 2);

    let bundle_info = &infos[0];
    assert_eq!(bundle_info.display_name, "a.flex");
    assert_eq!(bundle_info.media_type.as_deref(), Some("application/zip"));
    assert_eq!(bundle_info.skip_reason, SkipReason::None);
    let manifest = bundle_info.manifest.as_ref().unwrap();
    assert_eq!(manifest.extension.name, "sunset-pack");
    assert_eq!(manifest.extension.version, "1.2.0");
    let extracted = bundle_info.extracted_directory.as_ref().unwrap();
    assert!(extracted.join("manifest.json").is_file());
    assert!(extracted.join("brushes").join("soft.abr").is_file());

    let text_info = &infos[1];
    assert_eq!(text_info.display_name, "b.txt");
    assert_eq!(text_info.media_type.as_deref(), Some("text/plain"));
    assert_eq!(text_info.size, "just some notes".len() as u64);
    assert!(text_info.manifest.is_none());
    assert!(text_info.extracted_directory.is_none());
    assert_eq!(text_info.skip_reason, SkipReason::NotAnArchive);

    let input = workspace.input_directory().unwrap();
    assert_eq!(bundle_info.file, input.join("a.flex"));
    assert_eq!(text_info.file, input.join("b.txt"));
    assert!(bundle_info.file.is_file());
    assert!(text_info.file.is_file());
    assert!(
        bundle_info
            .checksum
            .as_deref()
            .is_some_and(|c| c.starts_with("sha256:"))
    );

    let found = workspaces.find_importer(workspace.id()).await.unwrap();
    assert_eq!(found.id(), workspace.id());
}

#[tokio::test]
async fn infos_follow_caller_order() {
    let stage = TestStage::new();
    let names = ["e.txt", "c.txt", "a.txt", "d.txt", "b.txt"];
    let locators: Vec<Locator> = names
        .iter()
        .map(|name| locator(&stage.write_source(name, name)))
        .collect();

    let workspace = service(&stage).import(&locators).await.unwrap();

    let staged: Vec<&str> = workspace
        .input_file_infos()
        .iter()
        .map(|info| info.display_name.as_str())
        .collect();
    assert_eq!(staged, names);
}

#[tokio::test]
async fn duplicate_display_names_are_disambiguated() {
    let stage = TestStage::new();
    let first = stage.write_source("one/notes.txt", "first");
    let second = stage.write_source("two/notes.txt", "second");
    let third = stage.write_source("three/notes.txt", "third");

    let workspace = service(&stage)
        .import(&[locator(&first), locator(&second), locator(&third)])
        .await
        .unwrap();

    let input = workspace.input_directory().unwrap();
    let infos = workspace.input_file_infos();
    assert_eq!(infos[0].file, input.join("notes.txt"));
    assert_eq!(infos[1].file, input.join("notes (1).txt"));
    assert_eq!(infos[2].file, input.join("notes (2).txt"));
    assert!(infos.iter().all(|info| info.display_name == "notes.txt"));
    assert_eq!(std::fs::read_to_string(&infos[1].file).unwrap(), "second");
}

#[tokio::test]
async fn decode_failures_are_recorded_not_raised() {
    let stage = TestStage::new();
    let bare = stage.sources().join("bare.zip");
    bundle::write_bare_zip(&bare);
    let broken = stage.sources().join("broken.zip");
    bundle::write_zip(&broken, &[("manifest.json", b"{ not json")]);
    let nested = stage.sources().join("nested.zip");
    bundle::write_nested_bundle(&nested, "sunset", "sunset-pack", "2.0.0");

    let workspace = service(&stage)
        .import(&[locator(&bare), locator(&broken), locator(&nested)])
        .await
        .unwrap();

    let infos = workspace.input_file_infos();
    assert_eq!(infos[0].skip_reason, SkipReason::ManifestMissing);
    assert!(infos[0].extracted_directory.is_some());
    assert_eq!(infos[1].skip_reason, SkipReason::ManifestMalformed);
    assert!(infos[1].manifest.is_none());
    assert_eq!(infos[2].skip_reason, SkipReason::None);
    assert_eq!(
        infos[2].manifest.as_ref().unwrap().extension.version,
        "2.0.0"
    );
}

#[tokio::test]
async fn unresolvable_locator_fails_whole_import() {
    let stage = TestStage::new();
    let good = stage.write_source("good.txt", "fine");
    let missing = stage.sources().join("missing.txt");
    let workspaces = service(&stage);

    let err = workspaces
        .import(&[locator(&good), locator(&missing)])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResourceMetadataUnavailable { .. }));
    assert!(workspaces.importers().is_empty().await);
    stage.assert_dir_empty("cache/importer");
}

#[tokio::test]
async fn empty_request_is_rejected() {
    let stage = TestStage::new();
    let workspaces = service(&stage);

    let err = workspaces.import(&[]).await.unwrap_err();

    assert!(matches!(err, Error::NoLocators));
    assert!(workspaces.importers().is_empty().await);
}

#[tokio::test]
async fn disposed_import_leaves_nothing_behind() {
    let stage = TestStage::new();
    let text = stage.write_source("b.txt", "bye");
    let workspaces = service(&stage);
    let workspace = workspaces.import(&[locator(&text)]).await.unwrap();

    workspace.dispose().await.unwrap();
    workspace.dispose().await.unwrap();

    assert!(!workspace.root_directory().exists());
    assert!(workspaces.find_importer(workspace.id()).await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn spawned_imports_run_independently() {
    let stage = TestStage::new();
    let workspaces = service(&stage);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let path = stage.write_source(&format!("item-{i}.txt"), "payload");
            workspaces.spawn_import(vec![locator(&path)])
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let workspace = handle.await.unwrap().unwrap();
        ids.push(workspace.id().to_string());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 8);
    assert_eq!(workspaces.importers().len().await, 8);
}

//! Bundle fixtures.
//!
//! Bundles are plain zip archives with a `manifest.json` either at the root
//! or inside a single top-level directory.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::ZipWriter;
use zip::write::FileOptions;

/// Manifest JSON for an extension with the given name and version.
pub fn manifest_json(name: &str, version: &str) -> String {
    serde_json::json!({
        "extension": {
            "name": name,
            "version": version,
            "description": format!("{name} fixture"),
        },
        "provides": { "content_types": ["brushes"] },
        "files": ["brushes/soft.abr"],
    })
    .to_string()
}

/// Write a zip archive at `path` holding `entries` as `(name, content)`.
///
/// # Panics
/// Panics if the archive cannot be written.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("write_zip: failed to create {}: {e}", parent.display()));
    }
    let file = File::create(path)
        .unwrap_or_else(|e| panic!("write_zip: failed to create {}: {e}", path.display()));
    let mut writer = ZipWriter::new(file);
    for (name, content) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .unwrap_or_else(|e| panic!("write_zip: failed to start {name}: {e}"));
        writer
            .write_all(content)
            .unwrap_or_else(|e| panic!("write_zip: failed to write {name}: {e}"));
    }
    writer
        .finish()
        .unwrap_or_else(|e| panic!("write_zip: failed to finish {}: {e}", path.display()));
}

/// Write a well-formed bundle with a root-level manifest and one payload file.
pub fn write_bundle(path: &Path, name: &str, version: &str) {
    let manifest = manifest_json(name, version);
    write_zip(
        path,
        &[
            ("manifest.json", manifest.as_bytes()),
            ("brushes/soft.abr", b"soft brush"),
        ],
    );
}

/// Write a bundle whose entries all live under `top/`, as produced by
/// zipping a folder.
pub fn write_nested_bundle(path: &Path, top: &str, name: &str, version: &str) {
    let manifest = manifest_json(name, version);
    let manifest_entry = format!("{top}/manifest.json");
    let payload_entry = format!("{top}/brushes/soft.abr");
    write_zip(
        path,
        &[
            (manifest_entry.as_str(), manifest.as_bytes()),
            (payload_entry.as_str(), b"soft brush"),
        ],
    );
}

/// Write a zip archive that carries no manifest at all.
pub fn write_bare_zip(path: &Path) {
    write_zip(path, &[("readme.txt", b"no manifest here")]);
}

//! Extension manifest parsing for `manifest.json` files.
//!
//! A bundle archive describes itself with a manifest at its root (or inside
//! its single top-level folder). The canonical filename is
//! [`MANIFEST_FILENAME`](crate::MANIFEST_FILENAME).
//!
//! # Example
//!
//! ```json
//! {
//!   "extension": {
//!     "name": "sunset-pack",
//!     "version": "1.2.0",
//!     "description": "Warm gradient brushes",
//!     "author": "Jane Doe"
//!   },
//!   "provides": { "content_types": ["brushes", "presets"] },
//!   "files": ["brushes/soft.abr", "presets/dusk.json"]
//! }
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete extension manifest loaded from `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtensionManifest {
    /// Core extension metadata.
    pub extension: ExtensionMeta,
    /// Content this bundle provides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provides: Option<Provides>,
    /// Files shipped in the bundle, relative to the manifest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

/// Basic metadata about an extension.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionMeta {
    /// Extension name (e.g., "sunset-pack").
    pub name: String,
    /// Semver version string.
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Content the extension provides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Provides {
    /// Content types this bundle carries.
    #[serde(default)]
    pub content_types: Vec<String>,
}

impl ExtensionManifest {
    /// Build a minimal manifest.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            extension: ExtensionMeta {
                name: name.into(),
                version: version.into(),
                description: None,
                author: None,
            },
            provides: None,
            files: Vec::new(),
        }
    }

    /// Parse and validate a manifest from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest from a file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ManifestNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize the manifest to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::ManifestSerialize(e.to_string()))
    }

    /// The parsed semver version. Valid for any manifest that passed validation.
    pub fn version(&self) -> Result<semver::Version> {
        semver::Version::parse(&self.extension.version).map_err(|e| Error::InvalidVersion {
            version: self.extension.version.clone(),
            source: e,
        })
    }

    /// Validate the manifest fields.
    pub fn validate(&self) -> Result<()> {
        let name = &self.extension.name;
        if name.is_empty() {
            return Err(Error::InvalidName {
                name: name.clone(),
                reason: "extension name must not be empty".to_string(),
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidName {
                name: name.clone(),
                reason: "extension name must contain only alphanumeric characters, hyphens, or underscores".to_string(),
            });
        }

        self.version()?;

        for file in &self.files {
            let path = Path::new(file);
            let confined = !file.is_empty()
                && !path.has_root()
                && path
                    .components()
                    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if !confined {
                return Err(Error::InvalidFilePath { path: file.clone() });
            }
        }

        Ok(())
    }
}

/// Decodes a manifest file into an [`ExtensionManifest`].
pub trait ManifestDecoder: Send + Sync {
    /// Decode the manifest at `path`.
    ///
    /// Fails with [`Error::ManifestNotFound`] when the file is missing and
    /// with a parse or validation error when it does not match the schema.
    fn decode(&self, path: &Path) -> Result<ExtensionManifest>;
}

/// Default decoder for JSON manifests.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManifestDecoder;

impl ManifestDecoder for JsonManifestDecoder {
    fn decode(&self, path: &Path) -> Result<ExtensionManifest> {
        ExtensionManifest::from_path(path)
    }
}

/// Find `file_name` inside an extracted bundle tree.
///
/// Looks at the tree root first. Archives created by zipping a folder put
/// everything under one top-level directory, so when the root holds exactly
/// one directory and nothing else, that directory is searched too.
pub fn locate_manifest(root: &Path, file_name: &str) -> Option<PathBuf> {
    let direct = root.join(file_name);
    if direct.is_file() {
        return Some(direct);
    }

    let mut entries = std::fs::read_dir(root).ok()?.filter_map(|e| e.ok());
    let only = entries.next()?;
    if entries.next().is_some() {
        return None;
    }
    let nested = only.path().join(file_name);
    (only.path().is_dir() && nested.is_file()).then_some(nested)
}

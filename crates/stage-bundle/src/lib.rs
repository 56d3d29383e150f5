//! Bundle interpretation for Stage.
//!
//! This crate provides the collaborators the workspace core uses to make
//! sense of staged items: the extension manifest schema and decoder, the
//! archive extractor and packer, and the media-type classifier. Each one
//! sits behind a trait so callers can plug in their own.

pub mod archive;
pub mod error;
pub mod manifest;
pub mod media;

/// The canonical filename for extension manifests inside a bundle archive.
pub const MANIFEST_FILENAME: &str = "manifest.json";

pub use archive::{ArchiveExtractor, ExtractReport, ZipExtractor, pack_directory};
pub use error::{Error, Result};
pub use manifest::{
    ExtensionManifest, ExtensionMeta, JsonManifestDecoder, ManifestDecoder, Provides,
    locate_manifest,
};
pub use media::{MediaTypeClassifier, SniffingClassifier};

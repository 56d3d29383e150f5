//! Per-item records produced by the import pipeline

use std::path::PathBuf;

use serde::Serialize;
use stage_bundle::ExtensionManifest;

/// Why structured decoding of a staged item produced no manifest.
///
/// The numeric codes are stable and may be persisted or shown to users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SkipReason {
    /// Decoding succeeded
    #[default]
    None = 0,
    /// The item is not a recognised archive
    NotAnArchive = 1,
    /// The archive holds no manifest file
    ManifestMissing = 2,
    /// The manifest exists but does not match the schema
    ManifestMalformed = 3,
    /// The archive was recognised but could not be extracted
    ExtractionFailed = 4,
}

impl SkipReason {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::NotAnArchive),
            2 => Some(Self::ManifestMissing),
            3 => Some(Self::ManifestMalformed),
            4 => Some(Self::ExtractionFailed),
            _ => None,
        }
    }

    /// Classify a decode failure.
    pub fn from_error(err: &stage_bundle::Error) -> Self {
        match err {
            stage_bundle::Error::NotAnArchive(_) => Self::NotAnArchive,
            stage_bundle::Error::ManifestNotFound(_) => Self::ManifestMissing,
            e if e.is_manifest_error() => Self::ManifestMalformed,
            _ => Self::ExtractionFailed,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::NotAnArchive => "not an archive",
            Self::ManifestMissing => "manifest missing",
            Self::ManifestMalformed => "manifest malformed",
            Self::ExtractionFailed => "extraction failed",
        };
        f.write_str(label)
    }
}

/// One staged input item plus whatever structured interpretation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    /// Staged file inside the workspace input directory
    pub file: PathBuf,
    /// Display name reported by the resolver
    pub display_name: String,
    /// Best-guess media type
    pub media_type: Option<String>,
    /// Size in bytes
    pub size: u64,
    /// `sha256:<hex>` of the staged bytes
    pub checksum: Option<String>,
    /// Where the archive was extracted, if extraction succeeded
    pub extracted_directory: Option<PathBuf>,
    /// Decoded extension manifest
    pub manifest: Option<ExtensionManifest>,
    pub skip_reason: SkipReason,
}

impl FileInfo {
    /// Record for a staged item before any decoding.
    pub fn staged(file: PathBuf, display_name: impl Into<String>, size: u64) -> Self {
        Self {
            file,
            display_name: display_name.into(),
            media_type: None,
            size,
            checksum: None,
            extracted_directory: None,
            manifest: None,
            skip_reason: SkipReason::None,
        }
    }

    /// Whether a manifest was decoded for this item.
    pub fn has_manifest(&self) -> bool {
        self.skip_reason == SkipReason::None && self.manifest.is_some()
    }
}

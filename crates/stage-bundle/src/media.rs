//! Media-type classification of staged files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Generic binary type; treated as "no specific information" when it
/// arrives as a declared hint.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Bytes inspected from the start of a file.
const SNIFF_LEN: usize = 512;

/// Best-guess media type for a staged file.
pub trait MediaTypeClassifier: Send + Sync {
    /// Classify `file`, optionally guided by a declared content type.
    ///
    /// The returned value is authoritative for the caller.
    fn classify(&self, file: &Path, hint: Option<&str>) -> Option<String>;
}

/// Classifier combining content signatures, the declared hint and the file
/// extension.
///
/// Precedence: magic-byte signature, then a specific (non-generic) hint,
/// then the extension table, then UTF-8 text detection, then a generic hint.
#[derive(Debug, Default, Clone, Copy)]
pub struct SniffingClassifier;

impl MediaTypeClassifier for SniffingClassifier {
    fn classify(&self, file: &Path, hint: Option<&str>) -> Option<String> {
        let head = read_head(file);
        let hint = hint.map(normalize_hint).filter(|h| !h.is_empty());

        if let Some(sniffed) = head.as_deref().and_then(sniff_signature) {
            return Some(sniffed.to_string());
        }
        if let Some(specific) = hint.as_ref().filter(|h| h.as_str() != OCTET_STREAM) {
            return Some(specific.clone());
        }
        if let Some(by_extension) = file
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| from_extension(&e.to_ascii_lowercase()))
        {
            return Some(by_extension.to_string());
        }
        if head.as_deref().is_some_and(looks_like_text) {
            return Some("text/plain".to_string());
        }
        hint
    }
}

fn read_head(file: &Path) -> Option<Vec<u8>> {
    let mut buf = Vec::with_capacity(SNIFF_LEN);
    File::open(file)
        .ok()?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut buf)
        .ok()?;
    Some(buf)
}

/// Lower-case the type and drop parameters such as `; charset=utf-8`.
fn normalize_hint(hint: &str) -> String {
    hint.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn sniff_signature(head: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"PK\x03\x04", "application/zip"),
        (b"PK\x05\x06", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
    ];

    if let Some(media_type) = SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, media_type)| *media_type)
    {
        return Some(media_type);
    }
    if head.len() >= 262 && &head[257..262] == b"ustar" {
        return Some("application/x-tar");
    }
    None
}

fn from_extension(extension: &str) -> Option<&'static str> {
    let media_type = match extension {
        "zip" => "application/zip",
        "json" => "application/json",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "tar" => "application/x-tar",
        "gz" | "tgz" => "application/gzip",
        _ => return None,
    };
    Some(media_type)
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.is_empty() || head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window is still text
        Err(e) => e.error_len().is_none(),
    }
}

//! Resource resolution: turning opaque locators into staged bytes

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};

/// Opaque reference to an external resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Path> for Locator {
    fn from(p: &Path) -> Self {
        Self(p.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Locator {
    fn from(p: PathBuf) -> Self {
        Self::from(p.as_path())
    }
}

/// What the resolver knows about a locator before staging it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// Human-facing name; used as the staged file name
    pub display_name: String,
    /// Declared byte size, if known
    pub size: Option<u64>,
    /// Declared content type, if any
    pub content_type: Option<String>,
}

/// Errors reported by a [`ResourceResolver`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{locator} is unavailable: {reason}")]
    Unavailable { locator: String, reason: String },

    #[error("I/O error for {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    pub fn unavailable(locator: &Locator, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(locator: &Locator, source: std::io::Error) -> Self {
        Self::Io {
            locator: locator.to_string(),
            source,
        }
    }
}

/// Supplies metadata and bytes for locators.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Resolve display name, declared size and declared content type.
    async fn metadata(&self, locator: &Locator) -> Result<ResourceMetadata, ResolveError>;

    /// Stream the locator's bytes into a new file at `destination`.
    ///
    /// Returns the number of bytes written.
    async fn stage(&self, locator: &Locator, destination: &Path) -> Result<u64, ResolveError>;
}

/// Resolver for local files, addressed by plain path or `file://` URI.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResolver;

impl FileResolver {
    pub fn new() -> Self {
        Self
    }

    fn path_of(locator: &Locator) -> PathBuf {
        let raw = locator.as_str();
        PathBuf::from(raw.strip_prefix("file://").unwrap_or(raw))
    }
}

#[async_trait]
impl ResourceResolver for FileResolver {
    async fn metadata(&self, locator: &Locator) -> Result<ResourceMetadata, ResolveError> {
        let path = Self::path_of(locator);
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ResolveError::unavailable(locator, e.to_string()))?;
        if !meta.is_file() {
            return Err(ResolveError::unavailable(locator, "not a regular file"));
        }
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ResolveError::unavailable(locator, "path has no file name"))?;

        Ok(ResourceMetadata {
            display_name,
            size: Some(meta.len()),
            content_type: None,
        })
    }

    async fn stage(&self, locator: &Locator, destination: &Path) -> Result<u64, ResolveError> {
        let source = tokio::fs::File::open(Self::path_of(locator))
            .await
            .map_err(|e| ResolveError::io(locator, e))?;
        let target = tokio::fs::File::create(destination)
            .await
            .map_err(|e| ResolveError::io(locator, e))?;

        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(target);
        let copied = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| ResolveError::io(locator, e))?;
        writer
            .flush()
            .await
            .map_err(|e| ResolveError::io(locator, e))?;
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_metadata_for_plain_path_and_uri() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.flex");
        std::fs::write(&file, b"12345").unwrap();

        let by_path = FileResolver.metadata(&Locator::from(file.as_path())).await.unwrap();
        let by_uri = FileResolver
            .metadata(&Locator::new(format!("file://{}", file.display())))
            .await
            .unwrap();

        assert_eq!(by_path.display_name, "a.flex");
        assert_eq!(by_path.size, Some(5));
        assert_eq!(by_path, by_uri);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let err = FileResolver
            .metadata(&Locator::from(temp.path().join("gone.txt")))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_directory_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let err = FileResolver
            .metadata(&Locator::from(temp.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_stage_copies_bytes() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("b.txt");
        std::fs::write(&source, "plain text").unwrap();
        let destination = temp.path().join("staged.txt");

        let copied = FileResolver
            .stage(&Locator::from(source), &destination)
            .await
            .unwrap();

        assert_eq!(copied, 10);
        assert_eq!(std::fs::read_to_string(destination).unwrap(), "plain text");
    }
}

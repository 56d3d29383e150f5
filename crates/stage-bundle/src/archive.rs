//! Archive extraction and packing.
//!
//! Extraction is synchronous; async callers run it on a blocking thread.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// Default upper bound on entries in a single archive.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Summary of a completed extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub destination: PathBuf,
    pub files: usize,
    pub directories: usize,
}

/// Extracts an archive file into a destination directory.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `destination`, creating it as needed.
    ///
    /// Fails with [`Error::NotAnArchive`] when the source is not in a
    /// recognised format.
    fn extract(&self, archive: &Path, destination: &Path) -> Result<ExtractReport>;
}

/// Zip extractor with an entry-count limit and path confinement.
#[derive(Debug, Clone, Copy)]
pub struct ZipExtractor {
    max_entries: usize,
}

impl ZipExtractor {
    pub fn new() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self { max_entries }
    }
}

impl Default for ZipExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<ExtractReport> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| match e {
            ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
                Error::NotAnArchive(archive.to_path_buf())
            }
            other => archive_error(archive, other),
        })?;

        if zip.len() > self.max_entries {
            return Err(Error::TooManyEntries {
                found: zip.len(),
                limit: self.max_entries,
            });
        }

        stage_fs::io::ensure_dir(destination)?;
        let mut report = ExtractReport {
            destination: destination.to_path_buf(),
            files: 0,
            directories: 0,
        };

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(|e| archive_error(archive, e))?;
            let relative = entry
                .enclosed_name()
                .map(Path::to_path_buf)
                .ok_or_else(|| Error::UnsafeEntry {
                    entry: entry.name().to_string(),
                })?;
            let target = destination.join(relative);

            if entry.is_dir() {
                stage_fs::io::ensure_dir(&target)?;
                report.directories += 1;
                continue;
            }

            if let Some(parent) = target.parent() {
                stage_fs::io::ensure_dir(parent)?;
            }
            let mut out = BufWriter::new(File::create(&target)?);
            io::copy(&mut entry, &mut out)?;
            report.files += 1;
        }

        tracing::debug!(
            archive = %archive.display(),
            files = report.files,
            directories = report.directories,
            "Extracted archive"
        );
        Ok(report)
    }
}

fn archive_error(path: &Path, err: ZipError) -> Error {
    Error::Archive {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Pack the contents of `source` into a zip archive at `archive`.
///
/// Entry names are relative to `source`, use `/` separators and are written
/// in sorted order so the same tree always produces the same entry list.
/// Returns the number of files written.
pub fn pack_directory(source: &Path, archive: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(source, source, &mut files)?;
    files.sort();

    if let Some(parent) = archive.parent() {
        stage_fs::io::ensure_dir(parent)?;
    }
    let mut writer = ZipWriter::new(BufWriter::new(File::create(archive)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in &files {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| archive_error(archive, e))?;
        let mut input = BufReader::new(File::open(source.join(name))?);
        io::copy(&mut input, &mut writer)?;
    }
    writer.finish().map_err(|e| archive_error(archive, e))?;

    tracing::debug!(archive = %archive.display(), files = files.len(), "Packed archive");
    Ok(files.len())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(name);
        }
    }
    Ok(())
}

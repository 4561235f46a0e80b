//! Package archive reader.
//!
//! Opens `.tar.bz2` and `.tar` package archives, lists their members once
//! at open time, and serves bounded reads of individual members.
//!
//! A compressed tarball is not seekable, so every read is a streaming pass
//! from the start of the container. Reads only ever buffer the requested
//! prefix of the member they target; passes over many members should use
//! [`PackageArchive::scan_prefixes`] so the container is decoded once.

use crate::error::{Result, VerifyError};
use crate::types::{ArchiveEntry, EntryKind};
use bzip2::read::BzDecoder;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Container formats accepted for package archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// bzip2-compressed tarball
    TarBz2,
    /// Uncompressed tarball
    Tar,
}

impl ArchiveFormat {
    /// All formats, longest suffix first.
    pub const ALL: [Self; 2] = [Self::TarBz2, Self::Tar];

    /// File name suffix, including the leading dot.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::TarBz2 => ".tar.bz2",
            Self::Tar => ".tar",
        }
    }

    /// Split a file name into its stem and archive format.
    pub fn split_file_name(file_name: &str) -> Option<(&str, Self)> {
        Self::ALL.iter().find_map(|format| {
            file_name
                .strip_suffix(format.suffix())
                .map(|stem| (stem, *format))
        })
    }
}

/// An open package archive.
///
/// The handle owns the underlying file for its whole lifetime; dropping it
/// closes the container.
#[derive(Debug)]
pub struct PackageArchive {
    path: PathBuf,
    format: ArchiveFormat,
    file: File,
    entries: Vec<ArchiveEntry>,
}

impl PackageArchive {
    /// Open an archive and index its members.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Archive`] if the file name has no recognized
    /// archive suffix, or the container cannot be opened or parsed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (_, format) = ArchiveFormat::split_file_name(&file_name).ok_or_else(|| {
            VerifyError::archive(&display, "not a .tar.bz2 or .tar package archive")
        })?;

        let file = File::open(&path).map_err(|e| VerifyError::archive(&display, e.to_string()))?;

        let mut archive = Self {
            path,
            format,
            file,
            entries: Vec::new(),
        };
        archive.entries = archive.read_index()?;
        tracing::debug!(
            archive = %archive.path.display(),
            members = archive.entries.len(),
            "opened package archive"
        );
        Ok(archive)
    }

    /// Path the archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container format chosen from the file name.
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// All members in container order, duplicates included.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Whether a member with this exact path exists.
    pub fn contains(&self, entry_path: &str) -> bool {
        self.entries.iter().any(|e| e.path == entry_path)
    }

    /// Read a whole member.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MissingEntry`] naming `entry_path` if the
    /// archive has no such member.
    pub fn extract(&self, entry_path: &str) -> Result<Vec<u8>> {
        self.extract_limited(entry_path, None)
    }

    /// Read at most `max_bytes` from the start of a member.
    pub fn extract_prefix(&self, entry_path: &str, max_bytes: usize) -> Result<Vec<u8>> {
        self.extract_limited(entry_path, Some(max_bytes))
    }

    /// Stream every member accepted by `select` and hand its first
    /// `max_bytes` to `visit`, in one pass over the container.
    ///
    /// Stops at the first error returned by `visit`.
    pub fn scan_prefixes<S, V>(&self, max_bytes: usize, mut select: S, mut visit: V) -> Result<()>
    where
        S: FnMut(&ArchiveEntry) -> bool,
        V: FnMut(&ArchiveEntry, &[u8]) -> Result<()>,
    {
        let mut archive = self.stream()?;
        let entries = archive.entries().map_err(|e| self.container_error(&e))?;
        for entry in entries {
            let entry = entry.map_err(|e| self.container_error(&e))?;
            if is_global_header(&entry) {
                continue;
            }
            let info = to_archive_entry(&entry);
            if !select(&info) {
                continue;
            }
            let data = read_prefix(entry, Some(max_bytes)).map_err(|e| self.container_error(&e))?;
            visit(&info, &data)?;
        }
        Ok(())
    }

    /// Duplicated paths resolve to their last occurrence.
    fn extract_limited(&self, entry_path: &str, max_bytes: Option<usize>) -> Result<Vec<u8>> {
        let occurrences = self.entries.iter().filter(|e| e.path == entry_path).count();
        if occurrences == 0 {
            return Err(self.missing(entry_path));
        }

        let mut seen = 0;
        let mut archive = self.stream()?;
        let entries = archive.entries().map_err(|e| self.container_error(&e))?;
        for entry in entries {
            let entry = entry.map_err(|e| self.container_error(&e))?;
            if is_global_header(&entry) || to_archive_entry(&entry).path != entry_path {
                continue;
            }
            seen += 1;
            if seen == occurrences {
                return read_prefix(entry, max_bytes).map_err(|e| self.container_error(&e));
            }
        }
        Err(self.missing(entry_path))
    }

    fn read_index(&self) -> Result<Vec<ArchiveEntry>> {
        let mut archive = self.stream()?;
        let entries = archive.entries().map_err(|e| self.container_error(&e))?;
        let mut index = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.container_error(&e))?;
            if !is_global_header(&entry) {
                index.push(to_archive_entry(&entry));
            }
        }
        Ok(index)
    }

    /// Rewind the file and start a new decoding pass. Passes must not nest.
    fn stream(&self) -> Result<tar::Archive<Box<dyn Read + '_>>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| self.container_error(&e))?;
        let reader: Box<dyn Read + '_> = match self.format {
            ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(file)),
            ArchiveFormat::Tar => Box::new(file),
        };
        Ok(tar::Archive::new(reader))
    }

    fn container_error(&self, err: &std::io::Error) -> VerifyError {
        VerifyError::archive(self.path.display().to_string(), err.to_string())
    }

    fn missing(&self, entry_path: &str) -> VerifyError {
        VerifyError::MissingEntry {
            path: self.path.display().to_string(),
            entry: entry_path.to_string(),
        }
    }
}

/// PAX global headers carry archive-wide attributes, not a member.
fn is_global_header<R: Read>(entry: &tar::Entry<'_, R>) -> bool {
    entry.header().entry_type().is_pax_global_extensions()
}

fn to_archive_entry<R: Read>(entry: &tar::Entry<'_, R>) -> ArchiveEntry {
    let entry_type = entry.header().entry_type();
    let kind = if entry_type.is_file() || entry_type.is_contiguous() {
        EntryKind::File
    } else if entry_type.is_dir() {
        EntryKind::Directory
    } else if entry_type.is_symlink() {
        EntryKind::Symlink
    } else if entry_type.is_hard_link() {
        EntryKind::Hardlink
    } else {
        EntryKind::Other
    };

    ArchiveEntry {
        path: normalize_path(&entry.path_bytes(), kind == EntryKind::Directory),
        kind,
        size: entry.size(),
    }
}

/// Member paths are compared without the trailing slash directories carry.
fn normalize_path(raw: &[u8], is_dir: bool) -> String {
    let path = String::from_utf8_lossy(raw);
    if is_dir {
        path.trim_end_matches('/').to_string()
    } else {
        path.into_owned()
    }
}

fn read_prefix<R: Read>(entry: R, max_bytes: Option<usize>) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    match max_bytes {
        Some(max) => {
            entry.take(max as u64).read_to_end(&mut data)?;
        }
        None => {
            let mut entry = entry;
            entry.read_to_end(&mut data)?;
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ArchiveBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            ArchiveFormat::split_file_name("foo-1.0-0.tar.bz2"),
            Some(("foo-1.0-0", ArchiveFormat::TarBz2))
        );
        assert_eq!(
            ArchiveFormat::split_file_name("foo-1.0-0.tar"),
            Some(("foo-1.0-0", ArchiveFormat::Tar))
        );
        assert_eq!(ArchiveFormat::split_file_name("foo-1.0-0.zip"), None);
    }

    #[test]
    fn test_list_entries_bz2() {
        let dir = tempfile::tempdir().unwrap();
        let path = ArchiveBuilder::new()
            .dir("bin")
            .file("bin/tool", b"#!/bin/sh\n")
            .symlink("bin/alias", "tool")
            .hardlink("bin/copy", "bin/tool")
            .write(dir.path(), "foo-1.0-0.tar.bz2");

        let archive = PackageArchive::open(&path).unwrap();
        assert_eq!(archive.format(), ArchiveFormat::TarBz2);
        let summary: Vec<(&str, EntryKind)> = archive
            .entries()
            .iter()
            .map(|e| (e.path.as_str(), e.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("bin", EntryKind::Directory),
                ("bin/tool", EntryKind::File),
                ("bin/alias", EntryKind::Symlink),
                ("bin/copy", EntryKind::Hardlink),
            ]
        );
        assert_eq!(archive.entries()[1].size, 10);
    }

    #[test]
    fn test_extract_and_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = ArchiveBuilder::new()
            .file("a.txt", b"hello world")
            .file("b.txt", b"second")
            .write(dir.path(), "foo-1.0-0.tar");

        let archive = PackageArchive::open(&path).unwrap();
        assert_eq!(archive.extract("b.txt").unwrap(), b"second".to_vec());
        assert_eq!(archive.extract_prefix("a.txt", 5).unwrap(), b"hello".to_vec());
        assert_eq!(archive.extract_prefix("a.txt", 4096).unwrap(), b"hello world".to_vec());
    }

    #[test]
    fn test_missing_entry_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = ArchiveBuilder::new()
            .file("a.txt", b"x")
            .write(dir.path(), "foo-1.0-0.tar.bz2");

        let archive = PackageArchive::open(&path).unwrap();
        let err = archive.extract("info/files").unwrap_err();
        assert!(matches!(err, VerifyError::MissingEntry { .. }));
        assert!(err.to_string().contains("info/files"));
    }

    #[test]
    fn test_scan_prefixes_single_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = ArchiveBuilder::new()
            .file("lib/a.dll", b"MZ-first")
            .file("lib/b.txt", b"skip")
            .file("lib/c.dll", b"MZ-second")
            .write(dir.path(), "foo-1.0-0.tar.bz2");

        let archive = PackageArchive::open(&path).unwrap();
        let mut seen = Vec::new();
        archive
            .scan_prefixes(
                4,
                |e| e.path.ends_with(".dll"),
                |e, data| {
                    seen.push((e.path.clone(), data.to_vec()));
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(
            seen,
            vec![
                ("lib/a.dll".to_string(), b"MZ-f".to_vec()),
                ("lib/c.dll".to_string(), b"MZ-s".to_vec()),
            ]
        );
    }

    #[test]
    fn test_global_header_is_not_a_member() {
        let dir = tempfile::tempdir().unwrap();
        let path = ArchiveBuilder::new()
            .global_header("19 comment=fixture\n")
            .file("a.txt", b"hello")
            .write(dir.path(), "foo-1.0-0.tar");

        let archive = PackageArchive::open(&path).unwrap();
        let paths: Vec<&str> = archive.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt"]);
        assert!(!archive.contains("pax_global_header"));
        assert_eq!(archive.extract("a.txt").unwrap(), b"hello".to_vec());

        let mut seen = Vec::new();
        archive
            .scan_prefixes(16, |_| true, |e, _| {
                seen.push(e.path.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_duplicate_path_reads_last_member() {
        let dir = tempfile::tempdir().unwrap();
        let path = ArchiveBuilder::new()
            .file("a.txt", b"first")
            .file("b.txt", b"between")
            .file("a.txt", b"second")
            .write(dir.path(), "foo-1.0-0.tar.bz2");

        let archive = PackageArchive::open(&path).unwrap();
        assert_eq!(archive.entries().len(), 3);
        assert_eq!(archive.extract("a.txt").unwrap(), b"second".to_vec());
        assert_eq!(archive.extract_prefix("a.txt", 3).unwrap(), b"sec".to_vec());
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo-1.0-0.zip");
        std::fs::write(&path, b"PK").unwrap();
        let err = PackageArchive::open(&path).unwrap_err();
        assert!(matches!(err, VerifyError::Archive { .. }));
    }

    #[test]
    fn test_corrupt_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo-1.0-0.tar.bz2");
        std::fs::write(&path, b"definitely not bzip2").unwrap();
        let err = PackageArchive::open(&path).unwrap_err();
        assert!(matches!(err, VerifyError::Archive { .. }));
    }
}

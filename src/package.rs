//! The package under verification.
//!
//! [`ArchivePackage`] bundles the open archive with everything derived from
//! it eagerly at open time: the file-name identity, the member path set,
//! and the decoded `info/index.json`.

use crate::archive::PackageArchive;
use crate::error::{Result, VerifyError};
use crate::identity;
use crate::types::{ArchiveEntry, IndexMetadata, PackageIdentity};
use std::collections::BTreeSet;
use std::path::Path;

/// Embedded identity and dependency record.
pub const INDEX_JSON: &str = "info/index.json";
/// Manifest of payload files.
pub const INFO_FILES: &str = "info/files";
/// Install-time placeholder manifest.
pub const HAS_PREFIX: &str = "info/has_prefix";

/// A package archive opened for verification.
#[derive(Debug)]
pub struct ArchivePackage {
    archive: PackageArchive,
    identity: PackageIdentity,
    paths: BTreeSet<String>,
    index_raw: Vec<u8>,
    index: IndexMetadata,
}

impl ArchivePackage {
    /// Open the archive at `path` and load its identity and metadata.
    ///
    /// # Errors
    ///
    /// Fails if the container cannot be read, the file name does not
    /// resolve to an identity, or `info/index.json` is absent or malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let archive = PackageArchive::open(path)?;
        let identity = identity::resolve(&path.to_string_lossy())?;

        let paths = archive.entries().iter().map(|e| e.path.clone()).collect();
        let index_raw = archive.extract(INDEX_JSON)?;
        let index = serde_json::from_slice(&index_raw)
            .map_err(|e| VerifyError::package(format!("{INDEX_JSON}: {e}")))?;

        Ok(Self {
            archive,
            identity,
            paths,
            index_raw,
            index,
        })
    }

    /// The underlying archive.
    pub fn archive(&self) -> &PackageArchive {
        &self.archive
    }

    /// Identity resolved from the file name.
    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    /// Package name from the file name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Package version from the file name.
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    /// Build string from the file name.
    pub fn build(&self) -> &str {
        &self.identity.build
    }

    /// Unique member paths, sorted.
    pub fn paths(&self) -> &BTreeSet<String> {
        &self.paths
    }

    /// Whether a member with this path exists.
    pub fn has_path(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Raw members, duplicates included.
    pub fn entries(&self) -> &[ArchiveEntry] {
        self.archive.entries()
    }

    /// Decoded `info/index.json`.
    pub fn index(&self) -> &IndexMetadata {
        &self.index
    }

    /// Undecoded bytes of `info/index.json`.
    pub fn index_raw(&self) -> &[u8] {
        &self.index_raw
    }

    /// Whether `info/index.json` declares a Windows platform.
    pub fn is_windows(&self) -> bool {
        self.index.is_windows()
    }

    /// Read a whole member.
    pub fn extract(&self, entry_path: &str) -> Result<Vec<u8>> {
        self.archive.extract(entry_path)
    }
}

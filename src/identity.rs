//! Package identity from archive file names.
//!
//! A package archive is named `<name>-<version>-<build>.<ext>`; the name
//! itself may contain dashes, so the triple is split on the last two.

use crate::archive::ArchiveFormat;
use crate::common::get_bad_seq;
use crate::error::{Result, VerifyError};
use crate::types::PackageIdentity;
use std::path::Path;

/// Derive `(name, version, build)` from an archive path or file name.
///
/// # Errors
///
/// Returns [`VerifyError::Package`] if the file name contains a disallowed
/// sequence, has no recognized archive suffix, or does not split into three
/// non-empty components.
pub fn resolve(file_name: &str) -> Result<PackageIdentity> {
    let base = Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(seq) = get_bad_seq(&base) {
        return Err(VerifyError::package(format!(
            "'{seq}' not allowed in file name '{base}'"
        )));
    }

    let (dist, _) = ArchiveFormat::split_file_name(&base)
        .ok_or_else(|| VerifyError::package(format!("did not expect filename: {base}")))?;

    let mut parts = dist.rsplitn(3, '-');
    let build = parts.next().unwrap_or_default();
    let version = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();

    if name.is_empty() || version.is_empty() || build.is_empty() {
        return Err(VerifyError::package(format!(
            "file name '{base}' is not <name>-<version>-<build>"
        )));
    }

    Ok(PackageIdentity {
        name: name.to_string(),
        version: version.to_string(),
        build: build.to_string(),
    })
}

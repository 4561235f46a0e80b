//! Windows binary architecture check.

use crate::checks::CheckContext;
use crate::constants::WINDOWS_ARCH_EXEMPT;
use crate::error::{Result, VerifyError};
use crate::formats::pe::sniff_object_type;
use crate::package::ArchivePackage;
use crate::types::{ArchiveEntry, ObjectFileType};

fn is_windows_binary(entry: &ArchiveEntry) -> bool {
    let lower = entry.path.to_ascii_lowercase();
    entry.is_file() && (lower.ends_with(".exe") || lower.ends_with(".dll"))
}

/// Every `.exe` and `.dll` must match the architecture declared in the index.
pub fn windows_arch(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    if WINDOWS_ARCH_EXEMPT.contains(&pkg.name()) || !pkg.is_windows() {
        return Ok(());
    }

    let arch = pkg.index().arch.as_deref().unwrap_or("<missing>");
    let expected = ObjectFileType::for_arch(arch).ok_or_else(|| {
        VerifyError::platform(format!("Unrecognized Windows architecture: {arch}"))
    })?;

    pkg.archive().scan_prefixes(
        ctx.options.object_prefix_len,
        is_windows_binary,
        |entry, data| {
            let found = sniff_object_type(data);
            tracing::debug!(path = %entry.path, object_type = %found, "sniffed binary");
            if found == expected {
                return Ok(());
            }
            Err(VerifyError::platform(format!(
                "File {} has object type {found}, but info/index.json arch is {arch}",
                entry.path
            )))
        },
    )
}

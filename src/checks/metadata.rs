//! `info/index.json` content checks.

use crate::checks::CheckContext;
use crate::common::{
    check_build_number, check_build_string, check_license_family, check_name, check_specs,
    check_version,
};
use crate::error::{Result, VerifyError};
use crate::package::{ArchivePackage, INDEX_JSON};

/// The index must agree with the file name and satisfy the field grammars.
pub fn index_json(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let index = pkg.index();

    for (field, embedded, expected) in [
        ("name", index.name.as_str(), pkg.name()),
        ("version", index.version.as_str(), pkg.version()),
        ("build", index.build.as_str(), pkg.build()),
    ] {
        if embedded != expected {
            return Err(VerifyError::package(format!(
                "{INDEX_JSON} for {field}: {embedded:?} != {expected:?}"
            )));
        }
    }

    if !index.build_number.is_i64() && !index.build_number.is_u64() {
        return Err(VerifyError::package(format!(
            "{INDEX_JSON}: invalid build_number: {}",
            index.build_number
        )));
    }

    let problem = check_name(&index.name)
        .or_else(|| check_version(&index.version))
        .or_else(|| check_build_number(&index.build_number))
        .or_else(|| check_build_string(&index.build));
    if let Some(msg) = problem {
        return Err(VerifyError::package(format!("{INDEX_JSON}: {msg}")));
    }

    let Some(depends) = index.depends.as_deref() else {
        return Err(VerifyError::package(format!(
            "{INDEX_JSON}: key 'depends' missing"
        )));
    };
    if let Some(msg) = check_specs(depends) {
        return Err(VerifyError::package(format!("{INDEX_JSON}: {msg}")));
    }

    match check_license_family(index.license_family()) {
        Some(msg) => Err(VerifyError::package(msg)),
        None => Ok(()),
    }
}

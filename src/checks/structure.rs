//! Structural checks over the member list and the file manifest.

use crate::checks::CheckContext;
use crate::common::all_ascii;
use crate::constants::{
    LINK_SCRIPT_SUFFIXES, NOARCH_SUBDIR, PREFERRED_ENV_KEY, RESERVED_DIRS, RESTRICTED_INFO_FILES,
};
use crate::error::{Result, VerifyError};
use crate::package::{ArchivePackage, INDEX_JSON, INFO_FILES};
use crate::types::EntryKind;
use std::collections::BTreeSet;

/// Every member path must be unique.
pub fn duplicate_members(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    if pkg.entries().len() != pkg.paths().len() {
        return Err(VerifyError::package("duplicate members"));
    }
    Ok(())
}

/// `info/index.json` must be ASCII (Windows packages may use a wider encoding).
pub fn index_encoding(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    if !all_ascii(pkg.index_raw(), pkg.is_windows()) {
        return Err(VerifyError::package(format!("non-ASCII in: {INDEX_JSON}")));
    }
    Ok(())
}

/// Member paths must be ASCII.
pub fn members(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    match pkg.entries().iter().find(|e| !e.path.is_ascii()) {
        Some(entry) => Err(VerifyError::package(format!(
            "non-ASCII path: {:?}",
            entry.path
        ))),
        None => Ok(()),
    }
}

/// `info/files` must list exactly the payload files of the archive.
pub fn info_files(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let raw = pkg.extract(INFO_FILES)?;
    if !all_ascii(&raw, pkg.is_windows()) {
        return Err(VerifyError::package(format!("non-ASCII in: {INFO_FILES}")));
    }

    let text = String::from_utf8_lossy(&raw);
    let listed: Vec<&str> = text.lines().map(str::trim).collect();
    if let Some(p) = listed.iter().find(|p| p.starts_with("info/")) {
        return Err(VerifyError::package(format!(
            "Did not expect '{p}' in {INFO_FILES}"
        )));
    }

    let declared: BTreeSet<&str> = listed.iter().copied().collect();
    if declared.len() != listed.len() {
        return Err(VerifyError::package(format!("{INFO_FILES}: duplicates")));
    }

    let actual: BTreeSet<&str> = pkg
        .entries()
        .iter()
        .filter(|e| !(e.path.starts_with("info/") || e.is_dir()))
        .map(|e| e.path.as_str())
        .collect();

    if declared == actual {
        return Ok(());
    }

    let problems: Vec<String> = declared
        .union(&actual)
        .filter_map(|p| {
            if !declared.contains(p) {
                Some(format!("'{p}' not in {INFO_FILES}"))
            } else if !actual.contains(p) {
                Some(format!("'{p}' not in tarball"))
            } else {
                None
            }
        })
        .collect();
    Err(VerifyError::package(format!(
        "{INFO_FILES}: {}",
        problems.join(", ")
    )))
}

/// Hardlinks do not survive installation.
pub fn no_hardlinks(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    match pkg.entries().iter().find(|e| e.kind == EntryKind::Hardlink) {
        Some(entry) => Err(VerifyError::package(format!(
            "hardlink found: {}",
            entry.path
        ))),
        None => Ok(()),
    }
}

fn is_reserved(path: &str) -> bool {
    RESERVED_DIRS.iter().any(|dir| {
        path == *dir
            || path
                .strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn is_junk(path: &str) -> bool {
    path == ".DS_Store" || path.ends_with("/.DS_Store") || path.ends_with('~')
}

/// Reserved directories, editor backups and Finder metadata are rejected.
pub fn not_allowed_files(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let index = pkg.index();
    let restricted_ok = index.subdir.as_deref() == Some(NOARCH_SUBDIR)
        || index.has_key(PREFERRED_ENV_KEY);

    for p in pkg.paths() {
        if is_reserved(p) || is_junk(p) {
            return Err(VerifyError::package(format!(
                "directory or filename not allowed: {p}"
            )));
        }
        if !restricted_ok && RESTRICTED_INFO_FILES.iter().any(|f| p.contains(f)) {
            return Err(VerifyError::package(format!("file not allowed: {p}")));
        }
    }
    Ok(())
}

/// A `.bat` and an `.exe` with the same stem conflict on Windows.
pub fn no_bat_and_exe(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let stems = |ext: &str| -> BTreeSet<&str> {
        pkg.paths()
            .iter()
            .filter_map(|p| p.strip_suffix(ext))
            .collect()
    };
    let bats = stems(".bat");
    let exes = stems(".exe");
    let both: Vec<&str> = bats.intersection(&exes).copied().collect();
    if both.is_empty() {
        return Ok(());
    }
    Err(VerifyError::package(format!(
        "Both .bat and .exe files: {}",
        both.join(", ")
    )))
}

/// Link scripts run arbitrary code at install time.
pub fn warn_post_link(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    for p in pkg.paths() {
        if LINK_SCRIPT_SUFFIXES.iter().any(|s| p.ends_with(s)) {
            ctx.warn(p.as_str());
        }
    }
    Ok(())
}

/// At most one `Menu/*.json`, named after the package.
pub fn menu_names(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let menus: Vec<&str> = pkg
        .paths()
        .iter()
        .filter(|p| p.starts_with("Menu/") && p.ends_with(".json"))
        .map(String::as_str)
        .collect();

    match menus.as_slice() {
        [] => Ok(()),
        [menu] => {
            let file_name = &menu["Menu/".len()..];
            if file_name == format!("{}.json", pkg.name()) {
                Ok(())
            } else {
                Err(VerifyError::package(format!(
                    "wrong Menu json file name: {file_name}"
                )))
            }
        }
        _ => Err(VerifyError::package(format!(
            "too many Menu json files: {}",
            menus.join(", ")
        ))),
    }
}

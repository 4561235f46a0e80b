//! Python layout checks: setuptools leftovers, bytecode placement and
//! site-packages ownership.

use crate::checks::CheckContext;
use crate::common::python_version_spec;
use crate::constants::{
    ALLOWED_EGGS, EASY_INSTALL_MARKER, SETUPTOOLS_PACKAGES, SETUPTOOLS_REMNANTS,
    STDLIB_PYC_PACKAGES, VENDORED_PACKAGES,
};
use crate::error::{Result, VerifyError};
use crate::package::ArchivePackage;
use memchr::memmem;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static SITE_PACKAGES_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"site-packages/([^/]+)").expect("valid site-packages regex"));

/// The interpreter package, exempt from several layout rules.
const PYTHON: &str = "python";

/// No eggs, `pkg_resources` or `easy_install` outside setuptools itself.
pub fn no_setuptools(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    if pkg.paths().iter().any(|p| p.ends_with("easy-install.pth")) {
        return Err(VerifyError::package("easy-install.pth file not allowed"));
    }
    if SETUPTOOLS_PACKAGES.contains(&pkg.name()) {
        return Ok(());
    }

    for p in pkg.paths() {
        if ALLOWED_EGGS.iter().any(|egg| p.ends_with(egg)) {
            continue;
        }
        if p.ends_with(".egg")
            || p.contains("site-packages/pkg_resources")
            || p.contains("site-packages/__pycache__/pkg_resources")
            || p.starts_with("bin/easy_install")
            || p.starts_with("Scripts/easy_install")
        {
            return Err(VerifyError::package(format!("file '{p}' not allowed")));
        }
    }
    Ok(())
}

/// Console scripts generated by `easy_install` hard-code the build prefix.
pub fn no_easy_install_script(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    let finder = memmem::Finder::new(EASY_INSTALL_MARKER);
    pkg.archive().scan_prefixes(
        ctx.options.script_prefix_len,
        |entry| {
            entry.is_file()
                && (entry.path.starts_with("bin/") || entry.path.starts_with("Scripts/"))
        },
        |entry, data| {
            if finder.find(data).is_some() {
                return Err(VerifyError::package(format!(
                    "easy install script found: {}",
                    entry.path
                )));
            }
            Ok(())
        },
    )
}

/// Namespace `.pth` files are not allowed.
pub fn no_pth(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    match pkg.paths().iter().find(|p| p.ends_with(".pth")) {
        Some(p) => Err(VerifyError::package(format!(
            "found namespace .pth file '{p}'"
        ))),
        None => Ok(()),
    }
}

/// Warn about optimized `.pyo` bytecode outside the interpreter package.
pub fn warn_pyo(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    if pkg.name() == PYTHON {
        return Ok(());
    }
    for p in pkg.paths().iter().filter(|p| p.ends_with(".pyo")) {
        ctx.warn(format!(".pyo file: {p}"));
    }
    Ok(())
}

/// Warn about `.py`/`.pyc` sources shadowed by an extension module.
pub fn no_py_next_so(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    for p in pkg.paths() {
        let Some(root) = p.strip_suffix(".so").or_else(|| p.strip_suffix(".pyd")) else {
            continue;
        };
        for ext in [".py", ".pyc"] {
            if pkg.has_path(&format!("{root}{ext}")) {
                ctx.warn(format!("{ext} next to: {p}"));
            }
        }
    }
    Ok(())
}

/// Bytecode belongs under `site-packages` unless the package is an interpreter or a build tool.
pub fn no_pyc_in_stdlib(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    if STDLIB_PYC_PACKAGES.contains(&pkg.name()) {
        return Ok(());
    }
    match pkg
        .paths()
        .iter()
        .find(|p| p.ends_with(".pyc") && !p.contains("site-packages"))
    {
        Some(p) => Err(VerifyError::package(format!(".pyc found in stdlib: {p}"))),
        None => Ok(()),
    }
}

/// No `lib2to3` grammar pickles outside the interpreter package.
pub fn no_2to3_pickle(pkg: &ArchivePackage, _ctx: &mut CheckContext<'_>) -> Result<()> {
    if pkg.name() == PYTHON {
        return Ok(());
    }
    match pkg
        .paths()
        .iter()
        .find(|p| p.contains("lib2to3") && p.ends_with(".pickle"))
    {
        Some(p) => Err(VerifyError::package(format!("found lib2to3 .pickle: {p}"))),
        None => Ok(()),
    }
}

/// Python 2 builds should ship a `.pyc` next to every site-packages module.
pub fn pyc_files(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    if pkg.build().contains("py3") {
        return Ok(());
    }
    for p in pkg.paths() {
        if !p.contains("/site-packages/") || p.contains("/port_v3/") {
            continue;
        }
        if p.ends_with(".py") && !pkg.has_path(&format!("{p}c")) {
            ctx.warn(format!("pyc missing for: {p}"));
        }
    }
    Ok(())
}

/// The site-packages directory implied by the package's python dependency.
pub fn site_packages_location(pkg: &ArchivePackage) -> Option<String> {
    let py_ver = python_version_spec(pkg.index().depends())?;
    if pkg.is_windows() {
        Some("Lib/site-packages".to_string())
    } else {
        Some(format!("lib/python{py_ver}/site-packages"))
    }
}

/// Only numpy and scipy may ship themselves, and only setuptools may ship its remnants.
pub fn list_packages(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    let location = site_packages_location(pkg);
    let mut top_level = BTreeSet::new();

    for p in pkg.paths() {
        let Some(caps) = SITE_PACKAGES_PAT.captures(p) else {
            continue;
        };
        if !location.as_deref().is_some_and(|loc| p.starts_with(loc)) {
            ctx.warn(format!("found {p}"));
        }
        let name = &caps[1];
        if name.contains('-') || name.ends_with(".pyc") {
            continue;
        }
        top_level.insert(name.to_string());
    }

    for vendored in VENDORED_PACKAGES {
        if pkg.name() != *vendored && top_level.contains(*vendored) {
            return Err(VerifyError::package(format!("found {vendored}")));
        }
    }

    if SETUPTOOLS_PACKAGES.contains(&pkg.name()) || pkg.name() == PYTHON {
        return Ok(());
    }
    match SETUPTOOLS_REMNANTS.iter().find(|r| top_level.contains(**r)) {
        Some(remnant) => Err(VerifyError::package(format!("found {remnant}"))),
        None => Ok(()),
    }
}

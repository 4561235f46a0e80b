//! Package Verifier - Static Checks for Conda Package Archives
//!
//! This library inspects built package archives (`.tar.bz2` / `.tar`) and
//! build recipes without installing or executing anything, and reports
//! every packaging rule they violate.
//!
//! # Features
//!
//! - **Identity Resolution**: Recovers `(name, version, build)` from archive file names
//! - **Structural Rules**: Member paths, file manifest, hardlinks, reserved directories
//! - **Metadata Rules**: `info/index.json` grammar and consistency with the file name
//! - **Placeholder Rules**: `info/has_prefix` records and binary placeholder length
//! - **Platform Rules**: `.exe`/`.dll` architecture against the declared Windows arch
//! - **Recipe Rules**: `meta.yaml` sections, requirements, sources and directory content
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pkg_verify::{verify_package, VerifierOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = verify_package("numpy-1.11.3-py27_0.tar.bz2", &VerifierOptions::new())?;
//!     for (check, failure) in report.failures() {
//!         println!("{check}: {failure}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Checks run in a fixed order. By default every check runs and all
//! failures are collected; [`VerifierOptions::strict`] stops at the first
//! one. Individual checks can be skipped by name.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod archive;
pub mod checks;
pub mod common;
pub mod constants;
pub mod error;
pub mod formats;
pub mod formatter;
pub mod identity;
pub mod package;
pub mod recipe;
pub mod types;

#[cfg(test)]
mod testutil;

pub use archive::{ArchiveFormat, PackageArchive};
pub use checks::{package_checks, Check, CheckContext, PACKAGE_CHECKS};
pub use error::{ErrorKind, Result, VerifyError};
pub use formats::pe::sniff_object_type;
pub use package::ArchivePackage;
pub use recipe::{recipe_checks, RecipeCheck, RECIPE_CHECKS};
pub use types::{
    ArchiveEntry, CheckReport, EntryKind, Failure, IndexMetadata, ObjectFileType,
    PackageIdentity, PrefixMode, PrefixRecord, Report, VerifierOptions,
};

use std::path::Path;

/// Verify a package archive by path.
///
/// Failing to open the archive, resolve its identity or decode its
/// `info/index.json` is returned as `Err`. Rule violations found by the
/// checks are recorded in the returned [`Report`].
///
/// # Example
///
/// ```rust,no_run
/// use pkg_verify::{verify_package, VerifierOptions};
///
/// let options = VerifierOptions::strict().ignoring("pyc_files");
/// let report = verify_package("foo-1.0-0.tar.bz2", &options)?;
/// assert!(report.passed());
/// # Ok::<(), pkg_verify::VerifyError>(())
/// ```
pub fn verify_package<P: AsRef<Path>>(path: P, options: &VerifierOptions) -> Result<Report> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "verifying package");

    let package = ArchivePackage::open(path)?;
    let mut report = Report::new(path.display().to_string());
    checks::run_checks(&package, PACKAGE_CHECKS, options, &mut report);
    Ok(report)
}

/// Verify a recipe directory holding a `meta.yaml`.
pub fn verify_recipe<P: AsRef<Path>>(recipe_dir: P, options: &VerifierOptions) -> Result<Report> {
    let recipe_dir = recipe_dir.as_ref();
    tracing::debug!(recipe = %recipe_dir.display(), "verifying recipe");

    let recipe = RecipeCheck::load(recipe_dir)?;
    let mut report = Report::new(recipe_dir.display().to_string());
    checks::run_checks(&recipe, RECIPE_CHECKS, options, &mut report);
    Ok(report)
}

/// Names of every package and recipe check, in execution order.
pub fn check_names() -> Vec<&'static str> {
    PACKAGE_CHECKS
        .iter()
        .map(|c| c.name)
        .chain(RECIPE_CHECKS.iter().map(|c| c.name))
        .collect()
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

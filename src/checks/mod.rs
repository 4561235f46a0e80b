//! Package checks.
//!
//! Every rule is a plain function wrapped in a named [`Check`]. The
//! registry [`PACKAGE_CHECKS`] lists them in execution order; each one
//! can be run on its own, skipped by name, or run together through
//! [`run_checks`].
//!
//! Checks never observe each other: they only read the package and
//! record warnings into their own [`CheckContext`].

pub mod metadata;
pub mod platform;
pub mod prefix;
pub mod python;
pub mod structure;

use crate::error::Result;
use crate::package::ArchivePackage;
use crate::types::{CheckReport, Failure, Report, VerifierOptions};

/// Per-check state handed to a running check.
#[derive(Debug)]
pub struct CheckContext<'a> {
    /// Options of the current run
    pub options: &'a VerifierOptions,
    check: &'static str,
    warnings: Vec<String>,
}

impl<'a> CheckContext<'a> {
    /// Fresh context for one run of the check called `check`.
    pub fn new(options: &'a VerifierOptions, check: &'static str) -> Self {
        Self {
            options,
            check,
            warnings: Vec::new(),
        }
    }

    /// Record a non-fatal finding.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(check = self.check, "{message}");
        self.warnings.push(message);
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

/// Signature shared by every check over a subject `T`.
pub type CheckFn<T> = fn(&T, &mut CheckContext<'_>) -> Result<()>;

/// A named rule over a subject (a package archive or a recipe).
pub struct Check<T> {
    /// Stable name, used by the ignore list
    pub name: &'static str,
    /// The rule itself
    pub check: CheckFn<T>,
}

impl<T> Check<T> {
    /// Run the rule and capture its outcome.
    pub fn evaluate(&self, subject: &T, options: &VerifierOptions) -> CheckReport {
        tracing::debug!(check = self.name, "running check");
        let mut ctx = CheckContext::new(options, self.name);
        let failure = (self.check)(subject, &mut ctx).err().map(|err| {
            tracing::debug!(check = self.name, error = %err, "check failed");
            Failure::from(&err)
        });
        CheckReport {
            name: self.name,
            warnings: ctx.into_warnings(),
            failure,
        }
    }
}

impl<T> std::fmt::Debug for Check<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

/// Run `checks` in order, appending their outcomes to `report`.
///
/// With `exit_on_error` the run stops after the first failing check.
pub fn run_checks<T>(
    subject: &T,
    checks: &[Check<T>],
    options: &VerifierOptions,
    report: &mut Report,
) {
    for check in checks {
        if options.is_ignored(check.name) {
            tracing::debug!(check = check.name, "skipping ignored check");
            report.skipped.push(check.name);
            continue;
        }

        let outcome = check.evaluate(subject, options);
        let failed = !outcome.passed();
        report.checks.push(outcome);

        if failed && options.exit_on_error {
            break;
        }
    }
}

/// All package checks, in execution order.
pub const PACKAGE_CHECKS: &[Check<ArchivePackage>] = &[
    Check { name: "duplicate_members", check: structure::duplicate_members },
    Check { name: "index_encoding", check: structure::index_encoding },
    Check { name: "members", check: structure::members },
    Check { name: "info_files", check: structure::info_files },
    Check { name: "no_hardlinks", check: structure::no_hardlinks },
    Check { name: "not_allowed_files", check: structure::not_allowed_files },
    Check { name: "index_json", check: metadata::index_json },
    Check { name: "no_bat_and_exe", check: structure::no_bat_and_exe },
    Check { name: "has_prefix", check: prefix::has_prefix },
    Check { name: "warn_post_link", check: structure::warn_post_link },
    Check { name: "no_setuptools", check: python::no_setuptools },
    Check { name: "no_easy_install_script", check: python::no_easy_install_script },
    Check { name: "no_pth", check: python::no_pth },
    Check { name: "warn_pyo", check: python::warn_pyo },
    Check { name: "no_py_next_so", check: python::no_py_next_so },
    Check { name: "no_pyc_in_stdlib", check: python::no_pyc_in_stdlib },
    Check { name: "no_2to3_pickle", check: python::no_2to3_pickle },
    Check { name: "pyc_files", check: python::pyc_files },
    Check { name: "menu_names", check: structure::menu_names },
    Check { name: "windows_arch", check: platform::windows_arch },
    Check { name: "list_packages", check: python::list_packages },
];

/// The package check registry, in execution order.
pub fn package_checks() -> &'static [Check<ArchivePackage>] {
    PACKAGE_CHECKS
}

/// Look up a package check by name.
pub fn package_check(name: &str) -> Option<&'static Check<ArchivePackage>> {
    PACKAGE_CHECKS.iter().find(|c| c.name == name)
}

/// Run one named check against a package, with default options.
#[cfg(test)]
pub(crate) fn run_one(pkg: &ArchivePackage, name: &str) -> CheckReport {
    package_check(name)
        .unwrap_or_else(|| panic!("no check named {name}"))
        .evaluate(pkg, &VerifierOptions::new())
}

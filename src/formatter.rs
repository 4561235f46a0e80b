//! Output formatters for verification reports.
//!
//! Trait-based rendering of a [`Report`] as human-readable text or JSON.

use crate::types::{CheckReport, Report};

/// Renders a report.
///
/// Implementors provide the per-part methods; [`format_report`] stitches
/// them together and can be overridden for formats that render the report
/// as a whole.
///
/// [`format_report`]: ReportFormatter::format_report
pub trait ReportFormatter {
    /// Header naming the verified archive or recipe.
    fn format_header(&self, report: &Report) -> Option<String>;

    /// One check's outcome.
    fn format_check(&self, check: &CheckReport) -> Option<String>;

    /// Closing summary line.
    fn format_summary(&self, report: &Report) -> Option<String>;

    /// Render the whole report.
    fn format_report(&self, report: &Report) -> String {
        let mut parts = Vec::new();

        if let Some(s) = self.format_header(report) {
            parts.push(s);
        }
        for check in &report.checks {
            if let Some(s) = self.format_check(check) {
                parts.push(s);
            }
        }
        if let Some(s) = self.format_summary(report) {
            parts.push(s);
        }

        parts.join("")
    }
}

/// Human-readable output formatter.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Also list passing and skipped checks
    pub verbose: bool,
    /// One line per report
    pub quiet: bool,
}

impl HumanFormatter {
    /// Default output: failures, warnings and the summary line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also list passing and skipped checks.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            quiet: false,
        }
    }

    /// One status line per report.
    pub fn quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
        }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_header(&self, report: &Report) -> Option<String> {
        if self.quiet {
            return None;
        }
        Some(format!("{}\n", report.source))
    }

    fn format_check(&self, check: &CheckReport) -> Option<String> {
        if self.quiet {
            return None;
        }

        let mut s = String::new();
        for warning in &check.warnings {
            s.push_str(&format!("  WARN  {}: {warning}\n", check.name));
        }
        match &check.failure {
            Some(failure) => s.push_str(&format!("  FAIL  {}: {failure}\n", check.name)),
            None if self.verbose => s.push_str(&format!("  ok    {}\n", check.name)),
            None => {}
        }

        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    fn format_summary(&self, report: &Report) -> Option<String> {
        let failures = report.failures().count();
        let status = if report.passed() { "PASS" } else { "FAIL" };

        if self.quiet {
            return Some(format!("{}: {status}\n", report.source));
        }

        let mut s = String::new();
        if self.verbose && !report.skipped.is_empty() {
            s.push_str(&format!("  skipped: {}\n", report.skipped.join(", ")));
        }
        s.push_str(&format!(
            "  {status} ({} checks, {failures} failed, {} warnings)\n",
            report.checks.len(),
            report.warnings().count()
        ));
        Some(s)
    }
}

/// JSON output formatter.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Pretty-printed JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-line JSON.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_header(&self, _report: &Report) -> Option<String> {
        None // Handled in format_report
    }

    fn format_check(&self, _check: &CheckReport) -> Option<String> {
        None // Handled in format_report
    }

    fn format_summary(&self, _report: &Report) -> Option<String> {
        None // Handled in format_report
    }

    fn format_report(&self, report: &Report) -> String {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            source: &'a str,
            passed: bool,
            checks: &'a [CheckReport],
            skipped: &'a [&'static str],
        }

        let output = JsonOutput {
            source: &report.source,
            passed: report.passed(),
            checks: &report.checks,
            skipped: &report.skipped,
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Failure;

    fn sample() -> Report {
        Report {
            source: "foo-1.0-0.tar.bz2".to_string(),
            checks: vec![
                CheckReport {
                    name: "duplicate_members",
                    warnings: vec![],
                    failure: None,
                },
                CheckReport {
                    name: "warn_post_link",
                    warnings: vec!["bin/.foo-post-link.sh".to_string()],
                    failure: None,
                },
                CheckReport {
                    name: "no_hardlinks",
                    warnings: vec![],
                    failure: Some(Failure {
                        kind: ErrorKind::Package,
                        message: "hardlink found: lib/b.so".to_string(),
                    }),
                },
            ],
            skipped: vec!["pyc_files"],
        }
    }

    #[test]
    fn test_human_formatter() {
        let output = HumanFormatter::new().format_report(&sample());
        assert!(output.starts_with("foo-1.0-0.tar.bz2\n"));
        assert!(output.contains("WARN  warn_post_link: bin/.foo-post-link.sh"));
        assert!(output.contains("FAIL  no_hardlinks: PackageError: hardlink found: lib/b.so"));
        assert!(output.contains("FAIL (3 checks, 1 failed, 1 warnings)"));
        assert!(!output.contains("ok    duplicate_members"));
        assert!(!output.contains("skipped"));
    }

    #[test]
    fn test_human_formatter_verbose() {
        let output = HumanFormatter::verbose().format_report(&sample());
        assert!(output.contains("ok    duplicate_members"));
        assert!(output.contains("skipped: pyc_files"));
    }

    #[test]
    fn test_human_formatter_quiet() {
        let output = HumanFormatter::quiet().format_report(&sample());
        assert_eq!(output, "foo-1.0-0.tar.bz2: FAIL\n");
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter::new().format_report(&sample());
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["passed"], false);
        assert_eq!(parsed["checks"][2]["name"], "no_hardlinks");
        assert_eq!(parsed["checks"][2]["failure"]["kind"], "package");
        assert_eq!(parsed["skipped"][0], "pyc_files");
    }

    #[test]
    fn test_json_formatter_compact() {
        let output = JsonFormatter::compact().format_report(&Report::new("x"));
        assert!(!output.contains('\n'));
        assert!(output.contains("\"passed\":true"));
    }
}

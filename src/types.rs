//! Core types for the package verifier.
//!
//! This module defines the data model shared by the archive reader,
//! the individual checks, and the report formatters.

use crate::error::{ErrorKind, VerifyError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// Object files
// =============================================================================

/// Architecture of a compiled Windows binary, as sniffed from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFileType {
    /// PE image for 32-bit x86.
    DllI386,
    /// PE image for x86-64.
    DllAmd64,
    /// Anything else, including truncated or malformed headers.
    Unknown,
}

impl ObjectFileType {
    /// The object type expected for a declared Windows `arch` value.
    pub fn for_arch(arch: &str) -> Option<Self> {
        match arch {
            "x86" => Some(Self::DllI386),
            "x86_64" => Some(Self::DllAmd64),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DllI386 => "DLL I386",
            Self::DllAmd64 => "DLL AMD64",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Archive entries
// =============================================================================

/// Kind of an archive member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Hard link
    Hardlink,
    /// Devices, FIFOs and other special members.
    Other,
}

/// One member of the package archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Forward-slash separated member path, without a trailing slash.
    pub path: String,
    /// Member type
    pub kind: EntryKind,
    /// Size in bytes as recorded in the header
    pub size: u64,
}

impl ArchiveEntry {
    /// Whether this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Whether this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

// =============================================================================
// Package identity and metadata
// =============================================================================

/// The `(name, version, build)` triple derived from an archive file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Build string
    pub build: String,
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.version, self.build)
    }
}

/// Decoded `info/index.json` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Build string
    pub build: String,
    /// Kept undecoded so that a non-integer value can be reported.
    #[serde(default)]
    pub build_number: Value,
    /// Dependency specs
    #[serde(default)]
    pub depends: Option<Vec<String>>,
    /// Declared license family
    #[serde(default)]
    pub license_family: Option<String>,
    /// License name, used when no family is given
    #[serde(default)]
    pub license: Option<String>,
    /// Target platform, e.g. `win` or `linux`
    #[serde(default)]
    pub platform: Option<String>,
    /// Target subdirectory, e.g. `win-64`
    #[serde(default)]
    pub subdir: Option<String>,
    /// Target architecture, e.g. `x86` or `x86_64`
    #[serde(default)]
    pub arch: Option<String>,
    /// Every other key, e.g. the `preferred_env` marker.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IndexMetadata {
    /// License family, falling back to the `license` field.
    pub fn license_family(&self) -> Option<&str> {
        self.license_family
            .as_deref()
            .or(self.license.as_deref())
    }

    /// Whether the record targets Windows.
    pub fn is_windows(&self) -> bool {
        self.platform.as_deref() == Some("win")
    }

    /// Whether an extra (unmodelled) key is present.
    pub fn has_key(&self, key: &str) -> bool {
        self.extra.contains_key(key)
    }

    /// Dependency specs, empty when absent.
    pub fn depends(&self) -> &[String] {
        self.depends.as_deref().unwrap_or(&[])
    }
}

// =============================================================================
// Prefix placeholders
// =============================================================================

/// How a placeholder is rewritten at install time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixMode {
    /// Placeholder rewritten as text
    Text,
    /// Placeholder rewritten in place inside a binary
    Binary,
    /// An unrecognized mode string, rejected by the placeholder check.
    Invalid(String),
}

impl PrefixMode {
    /// Parse a mode token.
    pub fn parse(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "binary" => Self::Binary,
            other => Self::Invalid(other.to_string()),
        }
    }
}

/// One line of `info/has_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRecord {
    /// Placeholder string found in the target
    pub placeholder: String,
    /// Rewrite mode
    pub mode: PrefixMode,
    /// Member containing the placeholder
    pub target: String,
}

// =============================================================================
// Options
// =============================================================================

/// Options controlling a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierOptions {
    /// Stop at the first failing check instead of collecting all failures
    pub exit_on_error: bool,
    /// Names of checks to skip
    pub ignore: BTreeSet<String>,
    /// Bytes read from each executable when sniffing its object type
    pub object_prefix_len: usize,
    /// Bytes scanned for installer-script markers
    pub script_prefix_len: usize,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            exit_on_error: false,
            ignore: BTreeSet::new(),
            object_prefix_len: 4096,
            script_prefix_len: 1024,
        }
    }

    /// Create options that stop at the first failure.
    pub fn strict() -> Self {
        Self {
            exit_on_error: true,
            ..Self::new()
        }
    }

    /// Skip the check called `name`.
    #[must_use]
    pub fn ignoring(mut self, name: impl Into<String>) -> Self {
        self.ignore.insert(name.into());
        self
    }

    /// Whether the check called `name` is skipped.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.contains(name)
    }
}

// =============================================================================
// Reports
// =============================================================================

/// A hard failure as recorded in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

impl From<&VerifyError> for Failure {
    fn from(err: &VerifyError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Check name
    pub name: &'static str,
    /// Non-fatal findings
    pub warnings: Vec<String>,
    /// Hard failure, if the check failed
    pub failure: Option<Failure>,
}

impl CheckReport {
    /// Whether the check passed.
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of verifying one package archive or recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Archive file or recipe directory that was verified
    pub source: String,
    /// Checks that ran, in execution order
    pub checks: Vec<CheckReport>,
    /// Checks skipped through the ignore list
    pub skipped: Vec<&'static str>,
}

impl Report {
    /// Empty report for `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// True when no check failed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(CheckReport::passed)
    }

    /// Failed checks with their failures.
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &Failure)> {
        self.checks
            .iter()
            .filter_map(|c| c.failure.as_ref().map(|f| (c.name, f)))
    }

    /// Every warning, tagged with its check.
    pub fn warnings(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.checks
            .iter()
            .flat_map(|c| c.warnings.iter().map(move |w| (c.name, w.as_str())))
    }

    /// The report of the check called `name`, if it ran.
    pub fn check(&self, name: &str) -> Option<&CheckReport> {
        self.checks.iter().find(|c| c.name == name)
    }
}

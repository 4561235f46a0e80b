//! Error types for the package verifier.
//!
//! Every rule violation is a hard failure carried by [`VerifyError`];
//! non-fatal findings are reported as warnings on the check report instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Primary error type for the package verifier.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The archive container could not be opened, parsed, or read.
    #[error("archive error: {path}: {message}")]
    Archive { path: String, message: String },

    /// A requested entry is not present in the archive.
    #[error("archive error: entry '{entry}' not in archive {path}")]
    MissingEntry { path: String, entry: String },

    /// The package violates a structural, naming, or metadata rule.
    #[error("{0}")]
    Package(String),

    /// The package violates a Windows architecture rule.
    #[error("{0}")]
    Platform(String),

    /// The recipe violates a recipe rule.
    #[error("{0}")]
    Recipe(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedded JSON metadata could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Recipe YAML could not be decoded.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl VerifyError {
    /// Build a package rule violation.
    pub fn package(msg: impl Into<String>) -> Self {
        Self::Package(msg.into())
    }

    /// Build a Windows architecture rule violation.
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    /// Build a recipe rule violation.
    pub fn recipe(msg: impl Into<String>) -> Self {
        Self::Recipe(msg.into())
    }

    /// Build a container-level error for the archive at `path`.
    pub fn archive(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Severity class of this error, used when rendering reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Archive { .. } | Self::MissingEntry { .. } => ErrorKind::Archive,
            Self::Package(_) => ErrorKind::Package,
            Self::Platform(_) => ErrorKind::Platform,
            Self::Recipe(_) => ErrorKind::Recipe,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) | Self::Yaml(_) => ErrorKind::Metadata,
        }
    }
}

/// Coarse classification of a [`VerifyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unreadable or unsupported container
    Archive,
    /// Packaging rule violation
    Package,
    /// Binary architecture mismatch
    Platform,
    /// Recipe rule violation
    Recipe,
    /// I/O failure outside the container
    Io,
    /// Undecodable `info/index.json`
    Metadata,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Archive => "ArchiveError",
            Self::Package => "PackageError",
            Self::Platform => "PlatformError",
            Self::Recipe => "RecipeError",
            Self::Io => "IoError",
            Self::Metadata => "MetadataError",
        };
        f.write_str(s)
    }
}

/// Result type alias for verifier operations.
pub type Result<T> = std::result::Result<T, VerifyError>;

//! Field grammars and text predicates shared by the package and recipe checks.
//!
//! Each `check_*` function returns `None` when the value is acceptable and
//! `Some(message)` describing the problem otherwise.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static NAME_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_][a-z0-9_\-\.]*$").expect("valid name regex"));
static VERSION_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\.]+$").expect("valid version regex"));
static BUILD_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\.\+]+$").expect("valid build string regex"));
static VER_SPEC_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\.,=!<>\*\|]+$").expect("valid version spec regex"));
static PY_VER_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.\d+)(\.?\*)?$").expect("valid python version regex"));

/// Separator pairs that never appear in well-formed names.
const BAD_SEQUENCES: &[&str] = &["--", "-.", "-_", ".-", "..", "._", "_-", "_."];

/// Shell metacharacters rejected in names.
const BAD_CHARS: &[char] = &[
    '/', '\\', '`', '$', '&', '|', ';', '<', '>', '(', ')', '{', '}', '[', ']', '*', '?', '!',
    '\'', '"', '#', '~', ':',
];

/// Bytes with no Windows-1252 mapping.
const CP1252_UNDEFINED: &[u8] = &[0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Return the first disallowed sequence or character in `s`.
pub fn get_bad_seq(s: &str) -> Option<String> {
    if let Some(seq) = BAD_SEQUENCES.iter().find(|seq| s.contains(*seq)) {
        return Some((*seq).to_string());
    }
    s.chars()
        .find(|c| c.is_control() || c.is_whitespace() || BAD_CHARS.contains(c))
        .map(String::from)
}

/// Whether `data` is pure ASCII.
///
/// With `allow_wide`, UTF-8 text and Windows-1252 text are tolerated too.
pub fn all_ascii(data: &[u8], allow_wide: bool) -> bool {
    if data.is_ascii() {
        return true;
    }
    allow_wide
        && (std::str::from_utf8(data).is_ok()
            || data.iter().all(|b| !CP1252_UNDEFINED.contains(b)))
}

/// Whether `name` is a well-formed package name, without the bad-sequence screening.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PAT.is_match(name)
}

/// Problem with a package name, if any.
pub fn check_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("package name missing".to_string());
    }
    if !NAME_PAT.is_match(name) || name.ends_with(['.', '-', '_']) {
        return Some(format!("invalid package name '{name}'"));
    }
    get_bad_seq(name).map(|seq| format!("'{seq}' is not allowed in package name: '{name}'"))
}

/// Problem with a version string, if any.
pub fn check_version(version: &str) -> Option<String> {
    if version.is_empty() {
        return Some("package version missing".to_string());
    }
    if !VERSION_PAT.is_match(version) {
        return Some(format!("invalid version '{version}'"));
    }
    if version.starts_with(['_', '.']) || version.ends_with(['_', '.']) {
        return Some(format!(
            "version cannot start or end with '_' or '.': {version}"
        ));
    }
    get_bad_seq(version).map(|seq| format!("'{seq}' not allowed in version '{version}'"))
}

/// Problem with a build string, if any.
pub fn check_build_string(build: &str) -> Option<String> {
    if BUILD_PAT.is_match(build) {
        None
    } else {
        Some(format!("invalid build string '{build}'"))
    }
}

/// A build number must be a non-negative integer.
pub fn check_build_number(number: &Value) -> Option<String> {
    if number.as_u64().is_some() {
        None
    } else {
        Some(format!("build/number '{number}' (not a positive integer)"))
    }
}

/// Check one `name [version [build]]` dependency spec.
pub fn check_spec(spec: &str) -> Option<String> {
    if spec.is_empty() {
        return Some("spec missing".to_string());
    }
    let parts: Vec<&str> = spec.split_whitespace().collect();
    match parts.as_slice() {
        [] => Some(format!("empty spec '{spec}'")),
        [name, ..] if !NAME_PAT.is_match(name) => Some(format!("invalid name spec '{spec}'")),
        [_, version, ..] if !VER_SPEC_PAT.is_match(version) => {
            Some(format!("invalid version spec '{spec}'"))
        }
        [_, _, build] if !BUILD_PAT.is_match(build) => {
            Some(format!("invalid build string in spec '{spec}'"))
        }
        [_, _, _, _, ..] => Some(format!("invalid spec (too many parts) '{spec}'")),
        _ => None,
    }
}

/// Check a list of specs; a package name may appear only once.
pub fn check_specs<S: AsRef<str>>(specs: &[S]) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    for spec in specs {
        let spec = spec.as_ref();
        if let Some(msg) = check_spec(spec) {
            return Some(msg);
        }
        let name = spec.split_whitespace().next().unwrap_or_default();
        if !seen.insert(name) {
            return Some(format!("duplicate specs: {spec}"));
        }
    }
    None
}

/// A license family (or its `license` fallback) must be a recognized one.
pub fn check_license_family(family: Option<&str>) -> Option<String> {
    match family {
        Some(family) if crate::constants::is_license_family(family) => None,
        Some(family) => Some(format!("wrong license family: {family}")),
        None => Some("wrong license family: None".to_string()),
    }
}

/// The `X.Y` python version pinned by a `python X.Y[*]` dependency.
pub fn python_version_spec<S: AsRef<str>>(specs: &[S]) -> Option<String> {
    specs.iter().find_map(|spec| {
        let mut parts = spec.as_ref().split_whitespace();
        if parts.next()? != "python" {
            return None;
        }
        let caps = PY_VER_PAT.captures(parts.next()?)?;
        Some(caps[1].to_string())
    })
}

//! Install-prefix placeholder manifest (`info/has_prefix`).
//!
//! Each line names a placeholder string, how it is rewritten (`text` or
//! `binary`), and the member that contains it:
//!
//! ```text
//! /opt/anaconda1anaconda2anaconda3 text bin/foo-config
//! "/opt/with space" binary lib/libfoo.so
//! ```
//!
//! Lines are tokenized with quote-aware splitting where a quote only opens a
//! token at its start. A line that does not yield exactly three tokens is
//! read as a text-mode record whose target is the whole line, so a blank
//! line names the empty target.

use crate::checks::CheckContext;
use crate::common::all_ascii;
use crate::constants::BINARY_PLACEHOLDER_LEN;
use crate::error::{Result, VerifyError};
use crate::package::{ArchivePackage, HAS_PREFIX};
use crate::types::{PrefixMode, PrefixRecord};

const WHITESPACE: &[char] = &[' ', '\t', '\r', '\n'];
const QUOTES: &[char] = &['"', '\''];

/// Split `line` into tokens, keeping quotes attached.
///
/// Returns `None` on an unterminated quote.
fn split_tokens(line: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if WHITESPACE.contains(&c) {
            chars.next();
            continue;
        }

        let mut token = String::new();
        if QUOTES.contains(&c) {
            token.push(c);
            chars.next();
            loop {
                let next = chars.next()?;
                token.push(next);
                if next == c {
                    break;
                }
            }
        } else {
            while let Some(&next) = chars.peek() {
                if WHITESPACE.contains(&next) {
                    break;
                }
                token.push(next);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Some(tokens)
}

/// Parse one manifest line.
pub fn parse_prefix_line(line: &str) -> PrefixRecord {
    let line = line.trim();
    let tokens = split_tokens(line).unwrap_or_default();

    match tokens.as_slice() {
        [placeholder, mode, target] => PrefixRecord {
            placeholder: placeholder.trim_matches(QUOTES).to_string(),
            mode: PrefixMode::parse(mode.trim_matches(QUOTES)),
            target: target.trim_matches(QUOTES).to_string(),
        },
        _ => PrefixRecord {
            placeholder: line.to_string(),
            mode: PrefixMode::Text,
            target: line.to_string(),
        },
    }
}

fn check_record(pkg: &ArchivePackage, record: &PrefixRecord) -> Result<()> {
    if !pkg.has_path(&record.target) {
        return Err(VerifyError::package(format!(
            "{HAS_PREFIX}: target '{}' not in package",
            record.target
        )));
    }

    match &record.mode {
        PrefixMode::Text => Ok(()),
        PrefixMode::Binary => {
            if pkg.name() == "python" {
                return Err(VerifyError::package(
                    "binary placeholder not allowed in Python",
                ));
            }
            if pkg.is_windows() {
                return Err(VerifyError::package(
                    "binary placeholder not allowed on Windows",
                ));
            }
            let len = record.placeholder.len();
            if len != BINARY_PLACEHOLDER_LEN {
                return Err(VerifyError::package(format!(
                    "{HAS_PREFIX}: binary placeholder not {BINARY_PLACEHOLDER_LEN} bytes, but: {len}"
                )));
            }
            Ok(())
        }
        PrefixMode::Invalid(mode) => Err(VerifyError::package(format!(
            "{HAS_PREFIX}: invalid mode '{mode}'"
        ))),
    }
}

/// Validate every record of `info/has_prefix`, when the package has one.
pub fn has_prefix(pkg: &ArchivePackage, ctx: &mut CheckContext<'_>) -> Result<()> {
    if !pkg.has_path(HAS_PREFIX) {
        return Ok(());
    }
    if pkg.is_windows() {
        ctx.warn(HAS_PREFIX);
    }

    let data = pkg.extract(HAS_PREFIX)?;
    if !all_ascii(&data, pkg.is_windows()) {
        return Err(VerifyError::package(format!("non-ASCII in: {HAS_PREFIX}")));
    }

    let text = String::from_utf8_lossy(&data);
    for line in text.lines() {
        let record = parse_prefix_line(line);
        tracing::trace!(?record, "placeholder record");
        check_record(pkg, &record)?;
    }
    Ok(())
}

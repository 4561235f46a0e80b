//! Recipe validation.
//!
//! A recipe is a directory holding `meta.yaml` plus the patches and test
//! files it references. [`RecipeCheck`] pairs the decoded metadata with the
//! directory; [`RECIPE_CHECKS`] lists the rules applied to it, run through
//! the same [`run_checks`](crate::checks::run_checks) runner as packages.

use crate::checks::{Check, CheckContext};
use crate::common::{
    check_build_number, check_license_family as license_family_problem, check_name, check_specs,
    check_version, is_valid_name,
};
use crate::constants::{
    section_fields, LICENSE_FAMILIES, RECIPE_DISALLOWED_EXTENSIONS, RECIPE_MAX_ARCHIVE_BYTES,
    RECIPE_MAX_KB, SUMMARY_MAX_CHARS,
};
use crate::error::{Result, VerifyError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recipe metadata file name.
pub const META_YAML: &str = "meta.yaml";

static URL_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(ftp|http(s)?)://").expect("valid url regex"));

static HASH_PATS: Lazy<[(&'static str, Regex); 3]> = Lazy::new(|| {
    [
        ("md5", Regex::new(r"^[a-f0-9]{32}$").expect("valid md5 regex")),
        ("sha1", Regex::new(r"^[a-f0-9]{40}$").expect("valid sha1 regex")),
        ("sha256", Regex::new(r"^[a-f0-9]{64}$").expect("valid sha256 regex")),
    ]
});

/// Recipe metadata together with the directory it came from.
#[derive(Debug, Clone)]
pub struct RecipeCheck {
    meta: Value,
    recipe_dir: PathBuf,
}

impl RecipeCheck {
    /// Wrap an already decoded `meta.yaml` document.
    pub fn new(meta: Value, recipe_dir: impl Into<PathBuf>) -> Self {
        Self {
            meta,
            recipe_dir: recipe_dir.into(),
        }
    }

    /// Read and decode `<recipe_dir>/meta.yaml`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid YAML, or is not a
    /// mapping at the top level.
    pub fn load<P: AsRef<Path>>(recipe_dir: P) -> Result<Self> {
        let recipe_dir = recipe_dir.as_ref();
        let text = std::fs::read_to_string(recipe_dir.join(META_YAML))?;
        let meta: Value = serde_yaml::from_str(&text)?;
        if !meta.is_object() {
            return Err(VerifyError::recipe(format!("{META_YAML}: not a mapping")));
        }
        tracing::debug!(recipe = %recipe_dir.display(), "loaded recipe");
        Ok(Self::new(meta, recipe_dir))
    }

    /// The decoded `meta.yaml` document.
    pub fn meta(&self) -> &Value {
        &self.meta
    }

    /// Directory holding `meta.yaml`.
    pub fn recipe_dir(&self) -> &Path {
        &self.recipe_dir
    }

    /// Look up a `section/key` path; a `null` value counts as absent.
    pub fn field(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .try_fold(&self.meta, |value, key| value.get(key))
            .filter(|value| !value.is_null())
    }

    fn text(&self, path: &str) -> Option<String> {
        self.field(path).map(value_to_string)
    }

    /// A list field as strings; a scalar reads as a one-item list.
    fn list(&self, path: &str) -> Vec<String> {
        match self.field(path) {
            Some(Value::Array(items)) => items.iter().map(value_to_string).collect(),
            Some(other) => vec![value_to_string(other)],
            None => Vec::new(),
        }
    }

    fn sources(&self) -> Vec<&serde_json::Map<String, Value>> {
        match self.field("source") {
            Some(Value::Object(src)) => vec![src],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        }
    }
}

/// Render a scalar the way it was written in the recipe.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn check_url(url: &str) -> Result<()> {
    if URL_PAT.is_match(url) {
        Ok(())
    } else {
        Err(VerifyError::recipe(format!("not a valid URL: {url}")))
    }
}

/// Known sections and keys only, then the package name, version and build number grammars.
pub fn check_fields(recipe: &RecipeCheck, _ctx: &mut CheckContext<'_>) -> Result<()> {
    if let Some(sections) = recipe.meta().as_object() {
        for (section, submeta) in sections {
            let allowed = section_fields(section)
                .ok_or_else(|| VerifyError::recipe(format!("Unknown section: {section}")))?;
            let (Some(allowed), Some(keys)) = (allowed, submeta.as_object()) else {
                continue;
            };
            if let Some(key) = keys.keys().find(|k| !allowed.contains(&k.as_str())) {
                return Err(VerifyError::recipe(format!(
                    "in section '{section}': unknown key '{key}'"
                )));
            }
        }
    }

    let name = recipe.text("package/name").unwrap_or_default();
    let version = recipe.text("package/version").unwrap_or_default();
    let number = recipe.field("build/number").cloned().unwrap_or(json!(0));

    match check_name(&name)
        .or_else(|| check_version(&version))
        .or_else(|| check_build_number(&number))
    {
        Some(msg) => Err(VerifyError::recipe(msg)),
        None => Ok(()),
    }
}

/// Build and run requirements must name valid packages with well-formed specs.
pub fn check_requirements(recipe: &RecipeCheck, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let build = recipe.list("requirements/build");
    let run = recipe.list("requirements/run");

    for (kind, reqs) in [("build", &build), ("run", &run)] {
        for req in reqs {
            let name = req.split_whitespace().next().unwrap_or_default();
            if !is_valid_name(name) {
                return Err(VerifyError::recipe(format!(
                    "invalid {kind} requirement name '{name}'"
                )));
            }
        }
    }

    for reqs in [&build, &run] {
        if let Some(msg) = check_specs(reqs) {
            return Err(VerifyError::recipe(msg));
        }
    }
    Ok(())
}

/// `about/summary` length and `about` URLs.
pub fn check_about(recipe: &RecipeCheck, _ctx: &mut CheckContext<'_>) -> Result<()> {
    if let Some(summary) = recipe.text("about/summary") {
        if summary.chars().count() > SUMMARY_MAX_CHARS {
            return Err(VerifyError::recipe(format!(
                "summary exceeds {SUMMARY_MAX_CHARS} characters"
            )));
        }
    }

    for field in [
        "about/home",
        "about/dev_url",
        "about/doc_url",
        "about/license_url",
    ] {
        match recipe.text(field) {
            Some(url) if !url.is_empty() => check_url(&url)?,
            _ => {}
        }
    }
    Ok(())
}

/// Source URLs, digests and git references.
pub fn check_source(recipe: &RecipeCheck, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let present = |src: &serde_json::Map<String, Value>, key: &str| {
        src.get(key)
            .map(value_to_string)
            .filter(|value| !value.is_empty())
    };

    for src in recipe.sources() {
        if let Some(url) = present(src, "url") {
            check_url(&url)?;
            for (algorithm, pattern) in HASH_PATS.iter() {
                match present(src, *algorithm) {
                    Some(digest) if !pattern.is_match(&digest) => {
                        return Err(VerifyError::recipe(format!("invalid hash: {digest}")));
                    }
                    _ => {}
                }
            }
        }

        if present(src, "git_url").is_some()
            && present(src, "git_tag").is_some()
            && present(src, "git_branch").is_some()
        {
            return Err(VerifyError::recipe(
                "cannot specify both git_branch and git_tag",
            ));
        }
    }
    Ok(())
}

/// `about/license_family`, falling back to `about/license`, must be a known family.
pub fn check_license_family(recipe: &RecipeCheck, ctx: &mut CheckContext<'_>) -> Result<()> {
    let family = recipe
        .text("about/license_family")
        .or_else(|| recipe.text("about/license"));

    match license_family_problem(family.as_deref()) {
        Some(msg) => {
            ctx.warn(format!(
                "about/license_family falls back to about/license; allowed families: {}",
                LICENSE_FAMILIES.join(", ")
            ));
            Err(VerifyError::recipe(msg))
        }
        None => Ok(()),
    }
}

/// Files referenced by the recipe must exist inside the recipe directory.
pub fn validate_files(recipe: &RecipeCheck, _ctx: &mut CheckContext<'_>) -> Result<()> {
    for field in ["test/files", "source/patches", "test/source_files"] {
        for file_name in recipe.list(field) {
            if file_name.starts_with("..") {
                return Err(VerifyError::recipe(format!(
                    "path outside recipe: {file_name}"
                )));
            }
            let path = recipe.recipe_dir().join(&file_name);
            if !path.is_file() {
                return Err(VerifyError::recipe(format!(
                    "no such file '{}'",
                    path.display()
                )));
            }
        }
    }
    Ok(())
}

/// No binaries or large archives, and a bounded total size.
pub fn check_dir_content(recipe: &RecipeCheck, _ctx: &mut CheckContext<'_>) -> Result<()> {
    let mut total_bytes: u64 = 0;

    for entry in WalkDir::new(recipe.recipe_dir()) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry.metadata().map_err(std::io::Error::from)?.len();
        total_bytes += size;

        let file_name = entry.file_name().to_string_lossy();
        let lower = file_name.to_lowercase();
        if (lower.ends_with(".bz2") || lower.ends_with(".gz")) && size > RECIPE_MAX_ARCHIVE_BYTES {
            return Err(VerifyError::recipe(format!("found: {file_name} (too large)")));
        }
        if RECIPE_DISALLOWED_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(ext))
        {
            return Err(VerifyError::recipe(format!("found: {file_name}")));
        }
    }

    if total_bytes > RECIPE_MAX_KB * 1024 {
        return Err(VerifyError::recipe(format!(
            "recipe too large: {} KB (limit {RECIPE_MAX_KB} KB)",
            total_bytes / 1024
        )));
    }
    Ok(())
}

/// All recipe checks, in execution order.
pub const RECIPE_CHECKS: &[Check<RecipeCheck>] = &[
    Check { name: "check_fields", check: check_fields },
    Check { name: "check_requirements", check: check_requirements },
    Check { name: "check_about", check: check_about },
    Check { name: "check_source", check: check_source },
    Check { name: "check_license_family", check: check_license_family },
    Check { name: "validate_files", check: validate_files },
    Check { name: "check_dir_content", check: check_dir_content },
];

/// The recipe check registry, in execution order.
pub fn recipe_checks() -> &'static [Check<RecipeCheck>] {
    RECIPE_CHECKS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VerifierOptions;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn base_meta() -> Value {
        json!({
            "package": {"name": "foo", "version": "1.0"},
            "source": {
                "url": "https://example.com/foo-1.0.tar.gz",
                "sha256": "a".repeat(64),
            },
            "build": {"number": 0},
            "requirements": {"build": ["python"], "run": ["python", "numpy >=1.11"]},
            "about": {
                "home": "https://example.com",
                "license": "MIT",
                "license_family": "MIT",
                "summary": "A package",
            },
        })
    }

    fn recipe(meta: Value) -> (TempDir, RecipeCheck) {
        let dir = tempfile::tempdir().unwrap();
        let check = RecipeCheck::new(meta, dir.path());
        (dir, check)
    }

    fn run(recipe: &RecipeCheck, name: &str) -> Option<String> {
        let check = RECIPE_CHECKS.iter().find(|c| c.name == name).unwrap();
        check
            .evaluate(recipe, &VerifierOptions::new())
            .failure
            .map(|f| f.message)
    }

    fn with(mut meta: Value, path: &str, value: Value) -> Value {
        let (section, key) = path.split_once('/').unwrap();
        meta[section][key] = value;
        meta
    }

    #[test]
    fn test_valid_recipe_passes_everything() {
        let (_dir, r) = recipe(base_meta());
        for check in RECIPE_CHECKS {
            assert_eq!(run(&r, check.name), None, "{}", check.name);
        }
    }

    #[test]
    fn test_field_lookup() {
        let (_dir, r) = recipe(with(base_meta(), "about/doc_url", Value::Null));
        assert_eq!(r.field("package/name"), Some(&json!("foo")));
        assert_eq!(r.field("about/doc_url"), None);
        assert_eq!(r.field("package/missing"), None);
        assert_eq!(r.list("requirements/run"), vec!["python", "numpy >=1.11"]);
    }

    #[test]
    fn test_unknown_section_and_key() {
        let mut meta = base_meta();
        meta["outputs"] = json!([]);
        let (_dir, r) = recipe(meta);
        assert_eq!(run(&r, "check_fields"), Some("Unknown section: outputs".to_string()));

        let (_dir, r) = recipe(with(base_meta(), "build/numbr", json!(1)));
        assert_eq!(
            run(&r, "check_fields"),
            Some("in section 'build': unknown key 'numbr'".to_string())
        );

        let (_dir, r) = recipe(with(base_meta(), "extra/anything", json!("goes")));
        assert_eq!(run(&r, "check_fields"), None);
    }

    #[test]
    fn test_field_grammars() {
        let (_dir, r) = recipe(with(base_meta(), "package/name", json!("Foo")));
        assert_eq!(run(&r, "check_fields"), Some("invalid package name 'Foo'".to_string()));

        let (_dir, r) = recipe(with(base_meta(), "build/number", json!(-1)));
        assert!(run(&r, "check_fields").unwrap().contains("not a positive integer"));

        let (_dir, r) = recipe(with(base_meta(), "package/version", json!(1.5)));
        assert_eq!(run(&r, "check_fields"), None);
    }

    #[test]
    fn test_requirements() {
        let (_dir, r) = recipe(with(base_meta(), "requirements/run", json!(["Numpy"])));
        assert_eq!(
            run(&r, "check_requirements"),
            Some("invalid run requirement name 'Numpy'".to_string())
        );

        let (_dir, r) = recipe(with(base_meta(), "requirements/build", json!(["zlib 1.2 a b"])));
        assert!(run(&r, "check_requirements").unwrap().contains("too many parts"));
    }

    #[test]
    fn test_about() {
        let (_dir, r) = recipe(with(base_meta(), "about/summary", json!("x".repeat(81))));
        assert_eq!(
            run(&r, "check_about"),
            Some("summary exceeds 80 characters".to_string())
        );

        let (_dir, r) = recipe(with(base_meta(), "about/dev_url", json!("github.com/foo")));
        assert_eq!(
            run(&r, "check_about"),
            Some("not a valid URL: github.com/foo".to_string())
        );
    }

    #[test]
    fn test_source() {
        let (_dir, r) = recipe(with(base_meta(), "source/sha256", json!("abc")));
        assert_eq!(run(&r, "check_source"), Some("invalid hash: abc".to_string()));

        let git = json!({
            "git_url": "https://example.com/foo.git",
            "git_tag": "v1.0",
            "git_branch": "main",
        });
        let mut meta = base_meta();
        meta["source"] = git;
        let (_dir, r) = recipe(meta);
        assert_eq!(
            run(&r, "check_source"),
            Some("cannot specify both git_branch and git_tag".to_string())
        );
    }

    #[test]
    fn test_license_family() {
        let (_dir, r) = recipe(with(base_meta(), "about/license_family", json!("BSD-3-Clause")));
        let check = RECIPE_CHECKS
            .iter()
            .find(|c| c.name == "check_license_family")
            .unwrap();
        let report = check.evaluate(&r, &VerifierOptions::new());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.failure.map(|f| f.message),
            Some("wrong license family: BSD-3-Clause".to_string())
        );

        let mut meta = base_meta();
        meta["about"].as_object_mut().unwrap().remove("license_family");
        let (_dir, r) = recipe(meta);
        assert_eq!(run(&r, "check_license_family"), None);
    }

    #[test]
    fn test_validate_files() {
        let (dir, r) = recipe(with(base_meta(), "source/patches", json!(["fix.patch"])));
        assert!(run(&r, "validate_files").unwrap().starts_with("no such file"));
        fs::write(dir.path().join("fix.patch"), "--- a\n+++ b\n").unwrap();
        assert_eq!(run(&r, "validate_files"), None);

        let (_dir, r) = recipe(with(base_meta(), "test/files", json!(["../secret"])));
        assert_eq!(
            run(&r, "validate_files"),
            Some("path outside recipe: ../secret".to_string())
        );
    }

    #[test]
    fn test_dir_content() {
        let (dir, r) = recipe(base_meta());
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/small.gz"), [0u8; 100]).unwrap();
        assert_eq!(run(&r, "check_dir_content"), None);

        fs::write(dir.path().join("data/big.bz2"), vec![0u8; 600]).unwrap();
        assert_eq!(
            run(&r, "check_dir_content"),
            Some("found: big.bz2 (too large)".to_string())
        );
        fs::remove_file(dir.path().join("data/big.bz2")).unwrap();

        fs::write(dir.path().join("libfoo.SO"), b"\x7fELF").unwrap();
        assert_eq!(run(&r, "check_dir_content"), Some("found: libfoo.SO".to_string()));
        fs::remove_file(dir.path().join("libfoo.SO")).unwrap();

        fs::write(dir.path().join("huge.txt"), vec![b'x'; 600 * 1024]).unwrap();
        assert_eq!(
            run(&r, "check_dir_content"),
            Some("recipe too large: 600 KB (limit 512 KB)".to_string())
        );
    }

    #[test]
    fn test_load_meta_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(META_YAML),
            "package:\n  name: foo\n  version: 1.0\nbuild:\n  number: 3\n",
        )
        .unwrap();
        let r = RecipeCheck::load(dir.path()).unwrap();
        assert_eq!(r.text("package/version"), Some("1.0".to_string()));
        assert_eq!(r.field("build/number"), Some(&json!(3)));

        fs::write(dir.path().join(META_YAML), "- just\n- a list\n").unwrap();
        assert!(RecipeCheck::load(dir.path()).is_err());
    }
}

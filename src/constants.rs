//! Static lookup tables shared by the package and recipe checks.

/// Recognized license families.
pub const LICENSE_FAMILIES: &[&str] = &[
    "AGPL",
    "GPL",
    "GPL2",
    "GPL3",
    "LGPL",
    "BSD",
    "MIT",
    "Apache",
    "PSF",
    "Public-Domain",
    "Proprietary",
    "Other",
];

/// Whether `family` is a recognized license family.
pub fn is_license_family(family: &str) -> bool {
    LICENSE_FAMILIES.contains(&family)
}

/// Top-level names that must not appear in a package.
pub const RESERVED_DIRS: &[&str] = &["conda-meta", "conda-bld", "pkgs", "pkgs32", "envs"];

/// Metadata files only allowed in `noarch` packages or with a `preferred_env`.
pub const RESTRICTED_INFO_FILES: &[&str] = &["info/package_metadata.json", "info/link.json"];

/// Subdir of platform-independent packages.
pub const NOARCH_SUBDIR: &str = "noarch";

/// Index key that opts a package into the restricted metadata files.
pub const PREFERRED_ENV_KEY: &str = "preferred_env";

/// Link-script suffixes that only produce a warning.
pub const LINK_SCRIPT_SUFFIXES: &[&str] = &[
    "-post-link.sh",
    "-pre-link.sh",
    "-pre-unlink.sh",
    "-post-link.bat",
    "-pre-link.bat",
    "-pre-unlink.bat",
];

/// Packages that are allowed to ship setuptools machinery.
pub const SETUPTOOLS_PACKAGES: &[&str] = &["setuptools", "distribute"];

/// Eggs shipped as test data by the packaging tools themselves.
pub const ALLOWED_EGGS: &[&str] = &["MyPyPa-0.1.0-py2.5.egg", "mytestegg-1.0.0-py3.4.egg"];

/// Marker written by setuptools into generated console scripts.
pub const EASY_INSTALL_MARKER: &[u8] = b"EASY-INSTALL-SCRIPT";

/// Packages allowed to ship `.pyc` files outside `site-packages`.
pub const STDLIB_PYC_PACKAGES: &[&str] = &["python", "scons", "conda-build"];

/// Packages exempt from the Windows architecture check.
pub const WINDOWS_ARCH_EXEMPT: &[&str] = &[
    "python",
    "conda-build",
    "pip",
    "xlwings",
    "phantomjs",
    "qt",
    "graphviz",
    "nsis",
    "swig",
];

/// Site-packages names owned by a single package.
pub const VENDORED_PACKAGES: &[&str] = &["numpy", "scipy"];

/// Setuptools remnants that only setuptools, distribute and python may ship.
pub const SETUPTOOLS_REMNANTS: &[&str] = &[
    "pkg_resources.py",
    "setuptools.pth",
    "easy_install.py",
    "setuptools",
];

/// Length every binary-mode placeholder must have.
pub const BINARY_PLACEHOLDER_LEN: usize = 255;

const PACKAGE_FIELDS: &[&str] = &["name", "version"];

const SOURCE_FIELDS: &[&str] = &[
    "fn",
    "url",
    "md5",
    "sha1",
    "sha256",
    "path",
    "git_url",
    "git_tag",
    "git_branch",
    "git_rev",
    "git_depth",
    "hg_url",
    "hg_tag",
    "svn_url",
    "svn_rev",
    "svn_ignore_externals",
    "patches",
];

const BUILD_FIELDS: &[&str] = &[
    "number",
    "string",
    "entry_points",
    "osx_is_app",
    "features",
    "track_features",
    "preserve_egg_dir",
    "no_link",
    "binary_relocation",
    "script",
    "noarch",
    "noarch_python",
    "has_prefix_files",
    "binary_has_prefix_files",
    "ignore_prefix_files",
    "detect_binary_files_with_prefix",
    "rpaths",
    "script_env",
    "always_include_files",
    "skip",
    "msvc_compiler",
    "pin_depends",
    "include_recipe",
    "preferred_env",
    "preferred_env_executable_paths",
    "run_exports",
    "skip_compile_pyc",
];

const REQUIREMENTS_FIELDS: &[&str] = &["build", "run", "conflicts"];

const APP_FIELDS: &[&str] = &[
    "entry",
    "icon",
    "summary",
    "type",
    "cli_opts",
    "own_environment",
];

const TEST_FIELDS: &[&str] = &[
    "requires",
    "commands",
    "files",
    "imports",
    "source_files",
];

const ABOUT_FIELDS: &[&str] = &[
    "home",
    "dev_url",
    "doc_url",
    "license_url",
    "license",
    "summary",
    "description",
    "license_family",
    "license_file",
    "readme",
];

/// Allowed keys per recipe section; `None` accepts any key.
pub const FIELDS: &[(&str, Option<&[&str]>)] = &[
    ("package", Some(PACKAGE_FIELDS)),
    ("source", Some(SOURCE_FIELDS)),
    ("build", Some(BUILD_FIELDS)),
    ("requirements", Some(REQUIREMENTS_FIELDS)),
    ("app", Some(APP_FIELDS)),
    ("test", Some(TEST_FIELDS)),
    ("about", Some(ABOUT_FIELDS)),
    ("extra", None),
];

/// Allowed keys for a recipe section, or `None` if the section is unknown.
pub fn section_fields(section: &str) -> Option<Option<&'static [&'static str]>> {
    FIELDS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
}

/// File extensions a recipe directory must not contain.
pub const RECIPE_DISALLOWED_EXTENSIONS: &[&str] = &[
    ".tar", ".tar.gz", ".tar.bz2", ".tar.xz", ".so", ".dylib", ".la", ".a", ".dll", ".pyd",
];

/// Largest compressed test archive allowed in a recipe, in bytes.
pub const RECIPE_MAX_ARCHIVE_BYTES: u64 = 512;

/// Largest total recipe directory size, in KiB.
pub const RECIPE_MAX_KB: u64 = 512;

/// Longest allowed `about/summary`.
pub const SUMMARY_MAX_CHARS: usize = 80;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_families() {
        assert!(is_license_family("MIT"));
        assert!(is_license_family("Public-Domain"));
        assert!(!is_license_family("mit"));
        assert!(!is_license_family("WTFPL"));
    }

    #[test]
    fn test_section_fields() {
        assert_eq!(section_fields("package"), Some(Some(&["name", "version"][..])));
        assert_eq!(section_fields("extra"), Some(None));
        assert_eq!(section_fields("outputs"), None);
    }
}

//! Fixture archives for unit tests.

use crate::package::ArchivePackage;
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

enum Member {
    File(String, Vec<u8>),
    Dir(String),
    Symlink(String, String),
    Hardlink(String, String),
    GlobalHeader(Vec<u8>),
}

/// Builds raw `.tar` / `.tar.bz2` archives member by member.
#[derive(Default)]
pub(crate) struct ArchiveBuilder {
    members: Vec<Member>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.members
            .push(Member::File(path.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.members.push(Member::Dir(path.to_string()));
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.members
            .push(Member::Symlink(path.to_string(), target.to_string()));
        self
    }

    pub fn hardlink(mut self, path: &str, target: &str) -> Self {
        self.members
            .push(Member::Hardlink(path.to_string(), target.to_string()));
        self
    }

    /// A PAX global extended header record.
    pub fn global_header(mut self, records: &str) -> Self {
        self.members
            .push(Member::GlobalHeader(records.as_bytes().to_vec()));
        self
    }

    /// Write the archive to `dir/file_name`, compressing when the name ends in `.bz2`.
    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        let file = File::create(&path).unwrap();
        if file_name.ends_with(".bz2") {
            let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
            let encoder = self.append_all(encoder);
            encoder.finish().unwrap();
        } else {
            let mut file = self.append_all(file);
            file.flush().unwrap();
        }
        path
    }

    fn append_all<W: Write>(&self, out: W) -> W {
        let mut builder = tar::Builder::new(out);
        for member in &self.members {
            let mut header = tar::Header::new_gnu();
            header.set_mode(0o644);
            match member {
                Member::File(path, data) => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(data.len() as u64);
                    builder.append_data(&mut header, path, data.as_slice()).unwrap();
                }
                Member::Dir(path) => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_mode(0o755);
                    header.set_size(0);
                    builder
                        .append_data(&mut header, format!("{path}/"), std::io::empty())
                        .unwrap();
                }
                Member::Symlink(path, target) => {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    builder.append_link(&mut header, path, target).unwrap();
                }
                Member::Hardlink(path, target) => {
                    header.set_entry_type(tar::EntryType::Link);
                    header.set_size(0);
                    builder.append_link(&mut header, path, target).unwrap();
                }
                Member::GlobalHeader(records) => {
                    header.set_entry_type(tar::EntryType::XGlobalHeader);
                    header.set_size(records.len() as u64);
                    builder
                        .append_data(&mut header, "pax_global_header", records.as_slice())
                        .unwrap();
                }
            }
        }
        builder.into_inner().unwrap()
    }
}

enum InfoFiles {
    Generated,
    Custom(String),
    Absent,
}

/// A well-formed package archive that tests then perturb.
///
/// `info/index.json` matches the file name and `info/files` lists every
/// payload file unless overridden.
pub(crate) struct PackageFixture {
    name: String,
    version: String,
    build: String,
    suffix: &'static str,
    index: Map<String, Value>,
    info_files: InfoFiles,
    extra_info: Vec<(String, Vec<u8>)>,
    payload: ArchiveBuilder,
    payload_files: Vec<String>,
}

impl PackageFixture {
    pub fn new(name: &str, version: &str, build: &str) -> Self {
        let index = json!({
            "name": name,
            "version": version,
            "build": build,
            "build_number": 0,
            "depends": [],
            "license_family": "MIT",
            "platform": "linux",
            "subdir": "linux-64",
            "arch": "x86_64",
        });
        let Value::Object(index) = index else {
            unreachable!()
        };
        Self {
            name: name.to_string(),
            version: version.to_string(),
            build: build.to_string(),
            suffix: ".tar.bz2",
            index,
            info_files: InfoFiles::Generated,
            extra_info: Vec::new(),
            payload: ArchiveBuilder::new(),
            payload_files: Vec::new(),
        }
    }

    /// Target Windows with the given `arch`.
    pub fn windows(self, arch: &str) -> Self {
        let subdir = if arch == "x86" { "win-32" } else { "win-64" };
        self.index_value("platform", json!("win"))
            .index_value("subdir", json!(subdir))
            .index_value("arch", json!(arch))
    }

    pub fn plain_tar(mut self) -> Self {
        self.suffix = ".tar";
        self
    }

    pub fn index_value(mut self, key: &str, value: Value) -> Self {
        self.index.insert(key.to_string(), value);
        self
    }

    pub fn without_index_key(mut self, key: &str) -> Self {
        self.index.remove(key);
        self
    }

    pub fn file(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.payload = self.payload.file(path, data);
        self.payload_files.push(path.to_string());
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.payload = self.payload.dir(path);
        self
    }

    pub fn hardlink(mut self, path: &str, target: &str) -> Self {
        self.payload = self.payload.hardlink(path, target);
        self.payload_files.push(path.to_string());
        self
    }

    /// Add a PAX global header, which is not a member.
    pub fn global_header(mut self, records: &str) -> Self {
        self.payload = self.payload.global_header(records);
        self
    }

    /// Add a file under `info/`.
    pub fn info(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.extra_info
            .push((path.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn info_files(mut self, text: &str) -> Self {
        self.info_files = InfoFiles::Custom(text.to_string());
        self
    }

    pub fn no_info_files(mut self) -> Self {
        self.info_files = InfoFiles::Absent;
        self
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}-{}{}", self.name, self.version, self.build, self.suffix)
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        let mut builder = ArchiveBuilder::new().file(
            "info/index.json",
            serde_json::to_vec_pretty(&Value::Object(self.index.clone())).unwrap(),
        );
        match &self.info_files {
            InfoFiles::Generated => {
                let mut listing = self.payload_files.join("\n");
                listing.push('\n');
                builder = builder.file("info/files", listing);
            }
            InfoFiles::Custom(text) => builder = builder.file("info/files", text),
            InfoFiles::Absent => {}
        }
        for (path, data) in &self.extra_info {
            builder = builder.file(path, data);
        }
        builder.members.extend(self.payload.members.iter().map(|m| match m {
            Member::File(p, d) => Member::File(p.clone(), d.clone()),
            Member::Dir(p) => Member::Dir(p.clone()),
            Member::Symlink(p, t) => Member::Symlink(p.clone(), t.clone()),
            Member::Hardlink(p, t) => Member::Hardlink(p.clone(), t.clone()),
            Member::GlobalHeader(r) => Member::GlobalHeader(r.clone()),
        }));
        builder.write(dir, &self.file_name())
    }

    /// Write the archive into a fresh temp dir and open it.
    pub fn open(&self) -> (TempDir, ArchivePackage) {
        let dir = tempfile::tempdir().unwrap();
        let path = self.write(dir.path());
        let package = ArchivePackage::open(&path).unwrap();
        (dir, package)
    }
}

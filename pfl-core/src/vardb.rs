//! Filesystem-backed [`PackageDatabase`]: the installed package database ("vdb").
//!
//! Layout: `<root>/<category>/<name>-<version>/<KEY>`, one file per metadata key,
//! plus `CONTENTS` listing the installed files. The merge timestamp is the
//! modification time of the package directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};

use crate::atom::Cpv;
use crate::contract::{ContentsEntry, PackageDatabase};
use crate::error::{PflError, Result};

pub const DEFAULT_VDB_DIR: &str = "/var/db/pkg";

// In-progress merges live next to installed packages under this prefix.
const MERGING_PREFIX: &str = "-MERGING-";

pub struct VarDb {
    root: PathBuf,
}

impl VarDb {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_dir(&self, cpv: &Cpv) -> Option<PathBuf> {
        let category = self.root.join(&cpv.category);
        let exact = category.join(cpv.pf());
        if exact.is_dir() {
            return Some(exact);
        }
        let explicit_r0 = category.join(format!("{}-r0", cpv.pf()));
        explicit_r0.is_dir().then_some(explicit_r0)
    }

    fn require_package_dir(&self, cpv: &Cpv) -> Result<PathBuf> {
        self.package_dir(cpv)
            .ok_or_else(|| PflError::NotInstalled(cpv.to_string()))
    }

    fn visible_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                warn!(path = %entry.path().display(), "Skipping non UTF-8 entry");
                continue;
            };
            if name.starts_with('.') || name.starts_with(MERGING_PREFIX) {
                continue;
            }
            if entry.file_type()?.is_dir() {
                entries.push((name, entry.path()));
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn packages_in(&self, category: &str, dir: &Path) -> Result<Vec<Cpv>> {
        let mut cpvs = Vec::new();
        for (pf, _) in Self::visible_entries(dir)? {
            match Cpv::parse(&format!("{category}/{pf}")) {
                Ok(cpv) => cpvs.push(cpv),
                Err(_) => warn!(category, entry = %pf, "Skipping unparsable package directory"),
            }
        }
        Ok(cpvs)
    }
}

impl PackageDatabase for VarDb {
    fn cpv_all(&self) -> Result<Vec<Cpv>> {
        let mut all = Vec::new();
        for (category, dir) in Self::visible_entries(&self.root)? {
            all.extend(self.packages_in(&category, &dir)?);
        }
        debug!(root = %self.root.display(), count = all.len(), "Enumerated installed packages");
        Ok(all)
    }

    fn cpv_exists(&self, cpv: &Cpv) -> bool {
        self.package_dir(cpv).is_some()
    }

    fn cp_list(&self, category: &str, name: &str) -> Result<Vec<Cpv>> {
        let dir = self.root.join(category);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(self
            .packages_in(category, &dir)?
            .into_iter()
            .filter(|cpv| cpv.name == name)
            .collect())
    }

    fn aux_get(&self, cpv: &Cpv, key: &str) -> Result<String> {
        let path = self.require_package_dir(cpv)?.join(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(value.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn merge_time(&self, cpv: &Cpv) -> Result<i64> {
        let modified = fs::metadata(self.require_package_dir(cpv)?)?.modified()?;
        let secs = modified
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PflError::Database(format!("{cpv}: merge time before epoch: {e}")))?
            .as_secs();
        Ok(secs as i64)
    }

    fn contents(&self, cpv: &Cpv) -> Result<Vec<ContentsEntry>> {
        let path = self.require_package_dir(cpv)?.join("CONTENTS");
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        // Installed paths are arbitrary bytes; undecodable ones get U+FFFD.
        let raw = String::from_utf8_lossy(&bytes);
        Ok(raw
            .lines()
            .filter_map(|line| {
                let entry = parse_contents_line(line);
                if entry.is_none() && !line.trim().is_empty() {
                    warn!(%cpv, line, "Ignoring unrecognised CONTENTS line");
                }
                entry
            })
            .collect())
    }
}

/// Parse one `CONTENTS` line.
///
/// ```text
/// obj /usr/bin/foo 0123456789abcdef0123456789abcdef 1700000000
/// sym /usr/lib/libfoo.so -> libfoo.so.1 1700000000
/// dir /usr/share/doc/foo-1.0
/// ```
///
/// Paths may contain spaces, so trailing fields are split off from the right.
pub fn parse_contents_line(line: &str) -> Option<ContentsEntry> {
    let (kind, rest) = line.trim_end().split_once(' ')?;
    let path = match kind {
        "obj" => {
            let mut fields = rest.rsplitn(3, ' ');
            let _mtime = fields.next()?;
            let _md5 = fields.next()?;
            fields.next()?
        }
        "sym" => rest.split_once(" -> ")?.0,
        "dir" | "fif" | "dev" => rest,
        _ => return None,
    };
    if path.is_empty() {
        return None;
    }
    Some(ContentsEntry {
        kind: kind.to_string(),
        path: path.to_string(),
    })
}

//! Available packages, read from the ebuild repositories' metadata cache.
//!
//! Each repository under the repos directory carries
//! `metadata/md5-cache/<category>/<name>-<version>` files made of `KEY=value` lines.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::atom::Cpv;
use crate::error::Result;

pub const DEFAULT_REPOS_DIR: &str = "/var/db/repos";

pub struct RepositoryCache {
    repos_dir: PathBuf,
}

impl RepositoryCache {
    pub fn new<P: Into<PathBuf>>(repos_dir: P) -> Self {
        Self {
            repos_dir: repos_dir.into(),
        }
    }

    fn cache_dirs(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.repos_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut dirs = Vec::new();
        for entry in entries {
            let cache = entry?.path().join("metadata").join("md5-cache");
            if cache.is_dir() {
                dirs.push(cache);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Every version of `category/name` available in any repository.
    pub fn cp_list(&self, category: &str, name: &str) -> Result<Vec<Cpv>> {
        let mut found = BTreeSet::new();
        for cache in self.cache_dirs()? {
            let dir = cache.join(category);
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                let pf = entry?.file_name().to_string_lossy().into_owned();
                if let Ok(cpv) = Cpv::parse(&format!("{category}/{pf}")) {
                    if cpv.name == name {
                        found.insert(cpv);
                    }
                }
            }
        }
        debug!(category, name, count = found.len(), "Listed available versions");
        Ok(found.into_iter().collect())
    }

    /// Value of `key` from the first repository that has a cache entry for `cpv`.
    pub fn aux_get(&self, cpv: &Cpv, key: &str) -> Result<Option<String>> {
        for cache in self.cache_dirs()? {
            let path = cache.join(&cpv.category).join(cpv.pf());
            if let Some(value) = read_cache_key(&path, key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

fn read_cache_key(path: &Path, key: &str) -> Result<Option<String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(raw.lines().find_map(|line| {
        line.split_once('=')
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }))
}

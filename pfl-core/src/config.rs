use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::repos::DEFAULT_REPOS_DIR;
use crate::vardb::DEFAULT_VDB_DIR;

pub const DEFAULT_UPLOAD_URL: &str = "https://www.portagefilelist.de/data.php";
pub const DEFAULT_QUERY_URL: &str = "https://www.portagefilelist.de/query.php";
pub const DEFAULT_ALLOWED_REPOS: [&str; 2] = ["gentoo", "guru"];
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Settings shared by both tools. Every field has a default, so an empty (or
/// absent) config file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub upload_url: String,
    pub query_url: String,
    /// Only packages installed from these repositories are collected.
    pub allowed_repos: Vec<String>,
    pub vdb_dir: PathBuf,
    pub repos_dir: PathBuf,
    /// Run state file; `None` picks the per-user default.
    pub info_file: Option<PathBuf>,
    /// Parent of the scratch directory; `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            query_url: DEFAULT_QUERY_URL.to_string(),
            allowed_repos: DEFAULT_ALLOWED_REPOS.iter().map(|r| r.to_string()).collect(),
            vdb_dir: PathBuf::from(DEFAULT_VDB_DIR),
            repos_dir: PathBuf::from(DEFAULT_REPOS_DIR),
            info_file: None,
            scratch_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn info_file(&self) -> PathBuf {
        self.info_file
            .clone()
            .unwrap_or_else(crate::runstate::default_info_file)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn trace_loaded(&self) {
        info!(
            upload_url = %self.upload_url,
            query_url = %self.query_url,
            allowed_repos = ?self.allowed_repos,
            vdb_dir = %self.vdb_dir.display(),
            "Loaded Settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }
}

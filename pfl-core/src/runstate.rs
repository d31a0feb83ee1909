//! Run-State Tracker: the "last run" watermark persisted between runs.
//!
//! The info file is INI-style and shared with older clients:
//!
//! ```ini
//! [PFL]
//! lastrun = 1700000000
//! version = 3.5.2
//! ```
//!
//! Sections and keys this module does not know about are kept on rewrite.
//! Reading and writing go through `rust-ini`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ini::Ini;
use nix::unistd::{getuid, User};
use tracing::{debug, info, warn};

use crate::error::{PflError, Result};

pub const SECTION: &str = "PFL";
const KEY_VERSION: &str = "version";
const KEY_LAST_RUN: &str = "lastrun";

/// Info file used when running as the `portage` user (e.g. from cron).
pub const SYSTEM_INFO_FILE: &str = "/var/lib/pfl/pfl.info";
const USER_INFO_FILE: &str = ".pfl.info";
const PORTAGE_USER: &str = "portage";

/// Version and watermark of the last completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Tool version that wrote the file; `None` if never written.
    pub version: Option<String>,
    pub last_run: i64,
}

impl RunState {
    pub fn completed_now(version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            last_run: chrono::Utc::now().timestamp(),
        }
    }
}

/// Watermark for the next collection.
///
/// Collect everything (`0`) when no version was recorded, or when the file was
/// written by a different version: an upgrade triggers a full recollection.
pub fn compute_watermark(state: &RunState, current_version: &str) -> i64 {
    match state.version.as_deref() {
        Some(version) if version == current_version => state.last_run,
        Some(version) => {
            info!(recorded = version, current = current_version, "Version changed, collecting everything");
            0
        }
        None => 0,
    }
}

/// Default info file: the system location for the `portage` user, `~/.pfl.info` otherwise.
///
/// The user is resolved from the real uid, not from `USER`/`LOGNAME`.
pub fn default_info_file() -> PathBuf {
    if is_portage_user() {
        return PathBuf::from(SYSTEM_INFO_FILE);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(USER_INFO_FILE)
}

fn is_portage_user() -> bool {
    match User::from_uid(getuid()) {
        Ok(Some(user)) => user.name == PORTAGE_USER,
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "Failed to look up the current user");
            false
        }
    }
}

/// Reads and writes the info file at a fixed path.
#[derive(Debug, Clone)]
pub struct RunStateStore {
    path: PathBuf,
}

impl RunStateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Ini> {
        if !self.path.exists() {
            return Ok(Ini::new());
        }
        Ini::load_from_file(&self.path).map_err(|e| self.error(e))
    }

    fn error(&self, reason: impl ToString) -> PflError {
        PflError::RunState {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Current state; a missing file is the default (never run) state.
    pub fn read(&self) -> Result<RunState> {
        let ini = self.load()?;
        let last_run = match ini.get_from(Some(SECTION), KEY_LAST_RUN) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = raw, path = %self.path.display(), "Unparsable lastrun, treating as 0");
                0
            }),
            None => 0,
        };
        let state = RunState {
            version: ini
                .get_from(Some(SECTION), KEY_VERSION)
                .map(|v| v.trim().to_string()),
            last_run,
        };
        debug!(path = %self.path.display(), ?state, "Read run state");
        Ok(state)
    }

    /// Replace the `[PFL]` keys, keeping everything else.
    ///
    /// The new content goes to a temporary file in the same directory which is
    /// then renamed over the info file.
    pub fn write(&self, state: &RunState) -> Result<()> {
        let mut ini = self.load()?;
        if let Some(version) = &state.version {
            ini.with_section(Some(SECTION)).set(KEY_VERSION, version.as_str());
        }
        ini.with_section(Some(SECTION))
            .set(KEY_LAST_RUN, state.last_run.to_string());

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.error(e))?;
        ini.write_to(&mut tmp).map_err(|e| self.error(e))?;
        tmp.flush().map_err(|e| self.error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.error(e))?;
        tmp.persist(&self.path).map_err(|e| self.error(e.error))?;

        info!(path = %self.path.display(), last_run = state.last_run, "Persisted run state");
        Ok(())
    }
}

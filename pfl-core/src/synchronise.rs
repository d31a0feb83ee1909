//! High-level pipeline: collect → archive → upload → commit watermark → cleanup.
//!
//! This module sequences one `pfl` run against the local package database:
//!   - Reads the run state and derives the watermark
//!   - Lists installed packages merged since the watermark (see [`crate::candidates`])
//!   - Writes one XML document per repository/category into a scratch directory
//!   - Compresses and tars the documents, then posts the tarball through an [`Uploader`]
//!   - Persists the new watermark and removes the scratch artifacts
//!
//! # Pretend mode
//! Documents are written and kept for inspection. Nothing is uploaded and the
//! run state is left untouched.
//!
//! # Error Handling
//! Any failure after collection aborts the run without touching the run state.
//! Scratch artifacts are never removed on failure; [`SynchroniseError::kept`]
//! lists what is left on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::archive::{archive, archive_path_for};
use crate::candidates::{list_candidates, CandidateFilter};
use crate::collect::collect_into_xml;
use crate::contract::{PackageDatabase, UploadResponse, Uploader};
use crate::error::PflError;
use crate::runstate::{compute_watermark, RunState, RunStateStore};

/// Everything a run needs to know, passed in explicitly.
#[derive(Debug, Clone)]
pub struct SynchroniseConfig {
    /// Version recorded in the run state.
    pub version: String,
    pub allowed_repos: Vec<String>,
    pub only_atom: Option<String>,
    pub only_repo: Option<String>,
    pub pretend: bool,
    /// Directory the `pfl-*` scratch directory is created in.
    pub scratch_base: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NothingToCollect,
    /// Pretend run; the scratch directory followed by its documents.
    Pretend { kept: Vec<PathBuf> },
    Uploaded {
        response: UploadResponse,
        removed: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchroniseReport {
    pub watermark: i64,
    pub count: usize,
    pub outcome: RunOutcome,
}

/// A failed run and the scratch artifacts it left behind.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct SynchroniseError {
    #[source]
    pub source: PflError,
    pub kept: Vec<PathBuf>,
}

impl From<PflError> for SynchroniseError {
    fn from(source: PflError) -> Self {
        Self {
            source,
            kept: Vec::new(),
        }
    }
}

/// Files still present for a scratch directory: its contents, the tarball and the directory.
pub fn remaining_artifacts(scratch_dir: &Path) -> Vec<PathBuf> {
    let mut kept = Vec::new();
    if scratch_dir.is_dir() {
        kept.push(scratch_dir.to_path_buf());
        if let Ok(entries) = fs::read_dir(scratch_dir) {
            let mut files: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
            files.sort();
            kept.extend(files);
        }
    }
    let tarball = archive_path_for(scratch_dir);
    if tarball.exists() {
        kept.push(tarball);
    }
    kept
}

fn abort(scratch_dir: &Path, source: PflError) -> SynchroniseError {
    let kept = remaining_artifacts(scratch_dir);
    error!(error = %source, kept = kept.len(), "[SYNC][ERROR] Run aborted, scratch files kept");
    SynchroniseError { source, kept }
}

fn cleanup(scratch_dir: &Path, archive_path: &Path, members: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in members.iter().map(PathBuf::as_path).chain([archive_path]) {
        match fs::remove_file(path) {
            Ok(()) => removed.push(path.to_path_buf()),
            Err(e) => warn!(path = %path.display(), error = %e, "[SYNC] Failed to remove scratch file"),
        }
    }
    match fs::remove_dir(scratch_dir) {
        Ok(()) => removed.push(scratch_dir.to_path_buf()),
        Err(e) => warn!(path = %scratch_dir.display(), error = %e, "[SYNC] Failed to remove scratch directory"),
    }
    removed
}

/// Run one collection according to `config`.
pub async fn synchronise<D, U>(
    config: &SynchroniseConfig,
    db: &D,
    uploader: &U,
    store: &RunStateStore,
) -> Result<SynchroniseReport, SynchroniseError>
where
    D: PackageDatabase + ?Sized,
    U: Uploader + ?Sized,
{
    info!(pretend = config.pretend, "[SYNC] Starting collection run");

    let state = store.read()?;
    let watermark = compute_watermark(&state, &config.version);
    info!(watermark, "[SYNC] Computed watermark");

    let filter = CandidateFilter {
        allowed_repos: &config.allowed_repos,
        only_atom: config.only_atom.as_deref(),
        only_repo: config.only_repo.as_deref(),
    };
    let candidates = list_candidates(db, watermark, &filter)?;

    let Some(collected) = collect_into_xml(db, &candidates, &config.scratch_base)? else {
        info!(
            "Nothing to collect. If this is wrong, set {}/lastrun in {} to 0",
            crate::runstate::SECTION,
            store.path().display()
        );
        if !config.pretend {
            store.write(&RunState::completed_now(&config.version))?;
        }
        return Ok(SynchroniseReport {
            watermark,
            count: 0,
            outcome: RunOutcome::NothingToCollect,
        });
    };

    if config.pretend {
        let mut kept = vec![collected.scratch_dir.clone()];
        kept.extend(collected.files.iter().cloned());
        info!(kept = kept.len(), "[SYNC] Pretend mode, nothing uploaded. The files need to be removed manually");
        return Ok(SynchroniseReport {
            watermark,
            count: collected.count,
            outcome: RunOutcome::Pretend { kept },
        });
    }

    let scratch_dir = collected.scratch_dir.as_path();
    let archive_path = archive_path_for(scratch_dir);
    let archived =
        archive(&collected.files, &archive_path).map_err(|e| abort(scratch_dir, e))?;

    info!(archive = %archived.path.display(), "[SYNC][UPLOAD] Uploading archive");
    let response = uploader
        .upload(&archived.path)
        .await
        .map_err(|e| abort(scratch_dir, e))?;
    info!(status = response.status, body = %response.body, "[SYNC][UPLOAD] Upload finished");

    store
        .write(&RunState::completed_now(&config.version))
        .map_err(|e| abort(scratch_dir, e))?;

    info!("[SYNC] Cleanup ...");
    let removed = cleanup(scratch_dir, &archived.path, &archived.members);
    info!(removed = removed.len(), "[SYNC] Done");

    Ok(SynchroniseReport {
        watermark,
        count: collected.count,
        outcome: RunOutcome::Uploaded { response, removed },
    })
}

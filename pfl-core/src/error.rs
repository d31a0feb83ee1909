//! Error type shared by every stage of the collection pipeline and the query client.

use std::path::PathBuf;

/// Errors raised by `pfl-core`.
///
/// Only [`PflError::EmptyManifest`] is expected during a normal run: the collector
/// treats it as "skip this package". Everything else aborts the current run.
#[derive(Debug, thiserror::Error)]
pub enum PflError {
    #[error("no such atom installed: {0}")]
    NotInstalled(String),

    #[error("invalid atom: {0}")]
    InvalidAtom(String),

    #[error("package {0} has no installed files")]
    EmptyManifest(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("empty result returned by the service")]
    EmptyResult,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("run state file {path:?}: {reason}")]
    RunState { path: PathBuf, reason: String },

    #[error("package database: {0}")]
    Database(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PflError>;

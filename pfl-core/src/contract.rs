//! # contract: the seams between the pipeline and the outside world
//!
//! The collection pipeline talks to three collaborators it does not own:
//!
//! - [`PackageDatabase`]: the local, read-only installed package database.
//! - [`Uploader`]: the remote endpoint receiving collected archives.
//! - [`FileQuery`]: the remote file-to-package lookup service used by `e-file`.
//!
//! Each one is a trait so production code can plug in the real vdb reader and
//! HTTP clients while tests use the `mockall` generated mocks
//! (`MockPackageDatabase`, `MockUploader`, `MockFileQuery`), exported behind the
//! `test-export-mocks` feature.

use std::path::Path;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::atom::Cpv;
use crate::error::Result;

/// One line of a package's installed file manifest (`CONTENTS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsEntry {
    /// Entry kind as recorded by the package manager: `obj`, `dir`, `sym`, `fif` or `dev`.
    pub kind: String,
    pub path: String,
}

/// Read access to the installed package database.
///
/// Keys follow the package manager's naming (`repository`, `USE`, `IUSE`,
/// `KEYWORDS`, `BUILD_TIME`, ...). A missing key reads as an empty string.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait PackageDatabase {
    /// Every installed package.
    fn cpv_all(&self) -> Result<Vec<Cpv>>;

    /// Whether exactly this package version is installed.
    fn cpv_exists(&self, cpv: &Cpv) -> bool;

    /// Installed versions of `category/name`.
    fn cp_list(&self, category: &str, name: &str) -> Result<Vec<Cpv>>;

    /// Raw value of one metadata key.
    fn aux_get(&self, cpv: &Cpv, key: &str) -> Result<String>;

    /// UNIX timestamp at which the package was merged.
    fn merge_time(&self, cpv: &Cpv) -> Result<i64>;

    /// Installed file manifest.
    fn contents(&self, cpv: &Cpv) -> Result<Vec<ContentsEntry>>;
}

/// What the upload endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

/// Posts a collected archive to the central server.
///
/// Implementations map every transport problem (connect, timeout, error status)
/// to [`crate::error::PflError::Transport`] and never retry.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, archive: &Path) -> Result<UploadResponse>;
}

/// One match returned by the file lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHit {
    pub category: String,
    pub package: String,
    pub version: String,
    pub path: String,
    pub repository: String,
}

/// Looks up which packages ship a file.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FileQuery: Send + Sync {
    /// `pattern` is a file name or absolute path; `*` acts as a wildcard.
    async fn query(&self, pattern: &str) -> Result<Vec<QueryHit>>;
}

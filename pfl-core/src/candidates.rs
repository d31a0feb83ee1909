//! Metadata Reader: which installed packages are new since the last run.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::atom::Cpv;
use crate::contract::PackageDatabase;
use crate::error::{PflError, Result};

/// `repository -> category -> package -> [versions]`
pub type Grouped = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>;

/// Packages selected for collection, grouped the way the XML documents are written.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Candidates {
    pub count: usize,
    pub grouped: Grouped,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Filters applied on top of the watermark.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter<'a> {
    pub allowed_repos: &'a [String],
    /// Restrict to one installed package (`category/name-version`).
    pub only_atom: Option<&'a str>,
    /// Restrict to one repository.
    pub only_repo: Option<&'a str>,
}

/// Repository a package was installed from; older entries only carry `REPOSITORY`.
pub fn repository_of<D: PackageDatabase + ?Sized>(db: &D, cpv: &Cpv) -> Result<String> {
    let repo = db.aux_get(cpv, "repository")?;
    if repo.is_empty() {
        return db.aux_get(cpv, "REPOSITORY");
    }
    Ok(repo)
}

/// List installed packages merged at or after `since` that pass `filter`.
///
/// A count of zero is a regular "nothing new" answer. Naming an atom that is
/// not installed fails with [`PflError::NotInstalled`]. A package whose
/// metadata cannot be read is logged and left out.
pub fn list_candidates<D: PackageDatabase + ?Sized>(
    db: &D,
    since: i64,
    filter: &CandidateFilter<'_>,
) -> Result<Candidates> {
    let cpvs = match filter.only_atom {
        Some(atom) => {
            let cpv = Cpv::parse(atom).map_err(|_| PflError::NotInstalled(atom.to_string()))?;
            if !db.cpv_exists(&cpv) {
                info!(atom, "No such atom installed");
                return Err(PflError::NotInstalled(atom.to_string()));
            }
            vec![cpv]
        }
        None => db.cpv_all()?,
    };

    let mut candidates = Candidates::default();
    for cpv in cpvs {
        let repo = match repository_of(db, &cpv) {
            Ok(repo) => repo,
            Err(e) => {
                warn!(%cpv, error = %e, "Failed to read repository, skipping package");
                continue;
            }
        };
        if !filter.allowed_repos.iter().any(|allowed| *allowed == repo) {
            continue;
        }
        match db.merge_time(&cpv) {
            Ok(merged) if merged < since => continue,
            Ok(_) => {}
            Err(e) => {
                warn!(%cpv, error = %e, "Failed to read merge time, skipping package");
                continue;
            }
        }
        if filter.only_repo.is_some_and(|only| only != repo) {
            continue;
        }

        debug!(%cpv, repo = %repo, "Selected package for collection");
        candidates
            .grouped
            .entry(repo)
            .or_default()
            .entry(cpv.category)
            .or_default()
            .entry(cpv.name)
            .or_default()
            .push(cpv.version);
        candidates.count += 1;
    }

    info!(since, count = candidates.count, "Listed collection candidates");
    Ok(candidates)
}

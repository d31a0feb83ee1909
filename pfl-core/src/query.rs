//! File lookup results: decoding the service response and enriching each
//! matched package with what is installed and available locally.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::atom::{compare_versions, Cpv};
use crate::contract::{PackageDatabase, QueryHit};
use crate::error::{PflError, Result};
use crate::repos::RepositoryCache;

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Value,
    message: Value,
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode the body returned by the query endpoint.
///
/// `{"error": {"code", "message"}}` becomes [`PflError::Service`], an empty
/// `{"result": []}` becomes [`PflError::EmptyResult`], and anything that is not
/// one of the two shapes is a [`PflError::MalformedResponse`].
pub fn parse_response(body: &str) -> Result<Vec<QueryHit>> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| PflError::MalformedResponse(e.to_string()))?;

    if let Some(error) = json.get("error") {
        let error: ServiceError = serde_json::from_value(error.clone())
            .map_err(|e| PflError::MalformedResponse(e.to_string()))?;
        return Err(PflError::Service {
            code: as_text(&error.code),
            message: as_text(&error.message),
        });
    }

    let Some(result) = json.get("result") else {
        return Err(PflError::MalformedResponse(body.to_string()));
    };
    let hits: Vec<QueryHit> = serde_json::from_value(result.clone())
        .map_err(|e| PflError::MalformedResponse(e.to_string()))?;
    if hits.is_empty() {
        return Err(PflError::EmptyResult);
    }
    debug!(hits = hits.len(), "Decoded query response");
    Ok(hits)
}

/// Hits for one `category/package`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HitGroup {
    pub versions: BTreeSet<String>,
    pub files: BTreeSet<String>,
    pub repositories: BTreeSet<String>,
}

/// `category -> package -> hits`
pub fn group_hits(hits: &[QueryHit]) -> BTreeMap<String, BTreeMap<String, HitGroup>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, HitGroup>> = BTreeMap::new();
    for hit in hits {
        let group = grouped
            .entry(hit.category.clone())
            .or_default()
            .entry(hit.package.clone())
            .or_default();
        group.versions.insert(hit.version.clone());
        group.files.insert(hit.path.clone());
        group.repositories.insert(hit.repository.clone());
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: String,
    /// `BUILD_TIME`; 0 when missing or unparsable.
    pub build_time: i64,
}

/// Everything `e-file` prints for one matched package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub category: String,
    pub package: String,
    pub seen_versions: Vec<String>,
    pub available_versions: Vec<String>,
    pub repositories: Vec<String>,
    pub installed: Vec<InstalledVersion>,
    pub homepage: Option<String>,
    pub description: Option<String>,
    pub files: Vec<String>,
}

impl PackageSummary {
    pub fn is_installed(&self) -> bool {
        !self.installed.is_empty()
    }
}

fn sorted_versions<I: IntoIterator<Item = String>>(versions: I) -> Vec<String> {
    let mut versions: Vec<String> = versions.into_iter().collect();
    versions.sort_by(|a, b| compare_versions(a, b));
    versions.dedup();
    versions
}

/// Combine service hits with the local package database and repository cache.
pub fn summarise<D: PackageDatabase + ?Sized>(
    hits: &[QueryHit],
    db: &D,
    repos: &RepositoryCache,
) -> Result<Vec<PackageSummary>> {
    let mut summaries = Vec::new();

    for (category, packages) in group_hits(hits) {
        for (package, group) in packages {
            let mut installed_cpvs = db.cp_list(&category, &package)?;
            installed_cpvs.sort_by(|a, b| compare_versions(&a.version, &b.version));
            let mut installed = Vec::with_capacity(installed_cpvs.len());
            for cpv in &installed_cpvs {
                let raw = db.aux_get(cpv, "BUILD_TIME")?;
                let build_time = raw.trim().parse().unwrap_or_else(|_| {
                    if !raw.trim().is_empty() {
                        warn!(%cpv, value = %raw, "Unparsable BUILD_TIME");
                    }
                    0
                });
                installed.push(InstalledVersion {
                    version: cpv.version.clone(),
                    build_time,
                });
            }

            let available_cpvs = repos.cp_list(&category, &package)?;
            let available_versions =
                sorted_versions(available_cpvs.iter().map(|cpv| cpv.version.clone()));
            let newest = available_versions
                .last()
                .map(|version| Cpv::new(&category, &package, version));
            let (homepage, description) = match &newest {
                Some(cpv) => (
                    repos.aux_get(cpv, "HOMEPAGE")?,
                    repos.aux_get(cpv, "DESCRIPTION")?,
                ),
                None => (None, None),
            };

            summaries.push(PackageSummary {
                seen_versions: sorted_versions(group.versions),
                available_versions,
                repositories: group.repositories.into_iter().collect(),
                installed,
                homepage,
                description,
                files: group.files.into_iter().collect(),
                category: category.clone(),
                package,
            });
        }
    }

    Ok(summaries)
}

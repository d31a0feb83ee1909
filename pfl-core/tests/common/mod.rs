#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pfl_core::atom::Cpv;
use pfl_core::contract::{ContentsEntry, MockPackageDatabase};
use pfl_core::PflError;

/// An installed package as the mocked database reports it.
#[derive(Clone)]
pub struct FakePackage {
    pub cpv: Cpv,
    pub repo: String,
    pub merge_time: i64,
    pub files: Vec<(String, String)>,
    pub use_flags: String,
    pub iuse: String,
    pub keywords: String,
}

impl FakePackage {
    pub fn new(cpv: &str, repo: &str, merge_time: i64, files: &[&str]) -> Self {
        Self {
            cpv: Cpv::parse(cpv).expect("valid cpv"),
            repo: repo.to_string(),
            merge_time,
            files: files
                .iter()
                .map(|f| (f.to_string(), "obj".to_string()))
                .collect(),
            use_flags: String::new(),
            iuse: String::new(),
            keywords: String::new(),
        }
    }

    pub fn with_flags(mut self, use_flags: &str, iuse: &str, keywords: &str) -> Self {
        self.use_flags = use_flags.to_string();
        self.iuse = iuse.to_string();
        self.keywords = keywords.to_string();
        self
    }
}

/// A `MockPackageDatabase` answering every call from `packages`.
pub fn mock_db(packages: Vec<FakePackage>) -> MockPackageDatabase {
    let packages = Arc::new(packages);
    let mut db = MockPackageDatabase::new();

    let p = packages.clone();
    db.expect_cpv_all()
        .returning(move || Ok(p.iter().map(|pkg| pkg.cpv.clone()).collect()));

    let p = packages.clone();
    db.expect_cpv_exists()
        .returning(move |cpv| p.iter().any(|pkg| pkg.cpv == *cpv));

    let p = packages.clone();
    db.expect_cp_list().returning(move |category, name| {
        Ok(p.iter()
            .filter(|pkg| pkg.cpv.category == category && pkg.cpv.name == name)
            .map(|pkg| pkg.cpv.clone())
            .collect())
    });

    let p = packages.clone();
    db.expect_aux_get().returning(move |cpv, key| {
        let pkg = p
            .iter()
            .find(|pkg| pkg.cpv == *cpv)
            .ok_or_else(|| PflError::NotInstalled(cpv.to_string()))?;
        Ok(match key {
            "repository" => pkg.repo.clone(),
            "USE" => pkg.use_flags.clone(),
            "IUSE" => pkg.iuse.clone(),
            "KEYWORDS" => pkg.keywords.clone(),
            _ => String::new(),
        })
    });

    let p = packages.clone();
    db.expect_merge_time().returning(move |cpv| {
        p.iter()
            .find(|pkg| pkg.cpv == *cpv)
            .map(|pkg| pkg.merge_time)
            .ok_or_else(|| PflError::NotInstalled(cpv.to_string()))
    });

    let p = packages;
    db.expect_contents().returning(move |cpv| {
        Ok(p.iter()
            .find(|pkg| pkg.cpv == *cpv)
            .map(|pkg| {
                pkg.files
                    .iter()
                    .map(|(path, kind)| ContentsEntry {
                        kind: kind.clone(),
                        path: path.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    });

    db
}

/// Write a package directory into an on-disk vdb.
pub fn install(vdb: &Path, category: &str, pf: &str, keys: &[(&str, &str)]) {
    let dir = vdb.join(category).join(pf);
    fs::create_dir_all(&dir).expect("create package dir");
    for (key, value) in keys {
        fs::write(dir.join(key), format!("{value}\n")).expect("write key");
    }
}

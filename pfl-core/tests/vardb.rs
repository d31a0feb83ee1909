mod common;

use std::fs;

use pfl_core::atom::Cpv;
use pfl_core::contract::PackageDatabase;
use pfl_core::vardb::{parse_contents_line, VarDb};
use pfl_core::PflError;
use tempfile::tempdir;

use common::install;

#[test]
fn enumerates_installed_packages_and_skips_merging_entries() {
    let vdb = tempdir().unwrap();
    install(vdb.path(), "dev-libs", "foo-1.0", &[("repository", "gentoo")]);
    install(vdb.path(), "dev-libs", "foo-1.1-r2", &[("repository", "gentoo")]);
    install(vdb.path(), "app-misc", "bar-2", &[("repository", "guru")]);
    install(vdb.path(), "app-misc", "-MERGING-baz-3", &[]);
    fs::create_dir_all(vdb.path().join(".hidden")).unwrap();

    let db = VarDb::new(vdb.path());
    let all = db.cpv_all().expect("enumerate");
    let names: Vec<String> = all.iter().map(|cpv| cpv.to_string()).collect();
    assert_eq!(
        names,
        vec!["app-misc/bar-2", "dev-libs/foo-1.0", "dev-libs/foo-1.1-r2"]
    );

    let foo = db.cp_list("dev-libs", "foo").unwrap();
    assert_eq!(foo.len(), 2);
    assert!(db.cp_list("dev-libs", "missing").unwrap().is_empty());
    assert!(db.cp_list("no-such-category", "foo").unwrap().is_empty());
}

#[test]
fn reads_keys_and_treats_missing_keys_as_empty() {
    let vdb = tempdir().unwrap();
    install(
        vdb.path(),
        "dev-libs",
        "foo-1.0",
        &[("repository", "gentoo"), ("USE", "amd64 ssl")],
    );
    let db = VarDb::new(vdb.path());
    let cpv = Cpv::parse("dev-libs/foo-1.0").unwrap();

    assert!(db.cpv_exists(&cpv));
    assert_eq!(db.aux_get(&cpv, "repository").unwrap(), "gentoo");
    assert_eq!(db.aux_get(&cpv, "USE").unwrap(), "amd64 ssl");
    assert_eq!(db.aux_get(&cpv, "IUSE").unwrap(), "");

    let now = chrono::Utc::now().timestamp();
    let merged = db.merge_time(&cpv).unwrap();
    assert!((now - merged).abs() < 600, "merge time {merged} should be close to {now}");
}

#[test]
fn unknown_package_is_not_installed() {
    let vdb = tempdir().unwrap();
    let db = VarDb::new(vdb.path());
    let cpv = Cpv::parse("dev-libs/ghost-1.0").unwrap();
    assert!(!db.cpv_exists(&cpv));
    assert!(matches!(
        db.aux_get(&cpv, "USE"),
        Err(PflError::NotInstalled(_))
    ));
}

#[test]
fn explicit_r0_directory_is_found() {
    let vdb = tempdir().unwrap();
    install(vdb.path(), "dev-libs", "foo-1.0-r0", &[("repository", "gentoo")]);
    let db = VarDb::new(vdb.path());
    let cpv = Cpv::parse("dev-libs/foo-1.0").unwrap();
    assert!(db.cpv_exists(&cpv));
    assert_eq!(db.aux_get(&cpv, "repository").unwrap(), "gentoo");
}

#[test]
fn reads_contents_with_spaces_and_symlinks() {
    let vdb = tempdir().unwrap();
    install(
        vdb.path(),
        "dev-libs",
        "foo-1.0",
        &[(
            "CONTENTS",
            "dir /usr/share/doc/foo\n\
             obj /usr/share/doc/foo/read me.txt d41d8cd98f00b204e9800998ecf8427e 1700000000\n\
             sym /usr/lib64/libfoo.so -> libfoo.so.1 1700000000\n\
             garbage",
        )],
    );
    let db = VarDb::new(vdb.path());
    let contents = db
        .contents(&Cpv::parse("dev-libs/foo-1.0").unwrap())
        .unwrap();
    let pairs: Vec<(&str, &str)> = contents
        .iter()
        .map(|e| (e.kind.as_str(), e.path.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("dir", "/usr/share/doc/foo"),
            ("obj", "/usr/share/doc/foo/read me.txt"),
            ("sym", "/usr/lib64/libfoo.so"),
        ]
    );
}

#[test]
fn missing_contents_file_is_an_empty_manifest() {
    let vdb = tempdir().unwrap();
    install(vdb.path(), "virtual", "libc-1", &[("repository", "gentoo")]);
    let db = VarDb::new(vdb.path());
    assert!(db
        .contents(&Cpv::parse("virtual/libc-1").unwrap())
        .unwrap()
        .is_empty());
}

#[test]
fn contents_line_parser_handles_every_kind() {
    assert_eq!(parse_contents_line("fif /run/foo.fifo").unwrap().kind, "fif");
    assert_eq!(parse_contents_line("dev /dev/null").unwrap().path, "/dev/null");
    assert!(parse_contents_line("obj /usr/bin/foo").is_none());
    assert!(parse_contents_line("xyz /usr/bin/foo").is_none());
    assert!(parse_contents_line("").is_none());
}

#[test]
fn non_utf8_package_directories_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let vdb = tempdir().unwrap();
    install(vdb.path(), "dev-libs", "foo-1.0", &[("repository", "gentoo")]);
    fs::create_dir_all(
        vdb.path()
            .join("dev-libs")
            .join(OsStr::from_bytes(b"caf\xe9-1.0")),
    )
    .unwrap();

    let db = VarDb::new(vdb.path());
    let all = db.cpv_all().unwrap();
    assert_eq!(all, vec![Cpv::parse("dev-libs/foo-1.0").unwrap()]);
}

use pfl::load_config::{load_config, parse_settings, ENV_INFO_FILE, ENV_QUERY_URL, ENV_UPLOAD_URL};
use pfl_core::config::{Settings, DEFAULT_TIMEOUT_SECS, DEFAULT_UPLOAD_URL};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var(ENV_UPLOAD_URL);
    env::remove_var(ENV_QUERY_URL);
    env::remove_var(ENV_INFO_FILE);
}

/// A full config file maps onto every field of `Settings`.
#[test]
#[serial]
fn test_load_config_reads_every_field() {
    clear_env();
    let config_yaml = r#"
upload_url: "http://localhost:8080/data.php"
query_url: "http://localhost:8080/query.php"
allowed_repos: [gentoo, guru, local]
vdb_dir: /tmp/vdb
repos_dir: /tmp/repos
info_file: /tmp/pfl.info
scratch_dir: /tmp/scratch
timeout_secs: 12
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let settings = load_config(Some(config_file.path())).expect("Config should load");

    assert_eq!(settings.upload_url, "http://localhost:8080/data.php");
    assert_eq!(settings.query_url, "http://localhost:8080/query.php");
    assert_eq!(settings.allowed_repos, vec!["gentoo", "guru", "local"]);
    assert_eq!(settings.vdb_dir, PathBuf::from("/tmp/vdb"));
    assert_eq!(settings.repos_dir, PathBuf::from("/tmp/repos"));
    assert_eq!(settings.info_file(), PathBuf::from("/tmp/pfl.info"));
    assert_eq!(settings.scratch_dir(), PathBuf::from("/tmp/scratch"));
    assert_eq!(settings.timeout_secs, 12);
}

/// Keys left out keep their defaults.
#[test]
#[serial]
fn test_load_config_partial_file_keeps_defaults() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "allowed_repos: [gentoo]\n").unwrap();

    let settings = load_config(Some(config_file.path())).expect("Config should load");

    assert_eq!(settings.allowed_repos, vec!["gentoo"]);
    assert_eq!(settings.upload_url, DEFAULT_UPLOAD_URL);
    assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
}

#[test]
fn test_parse_settings_empty_document_is_default() {
    assert_eq!(parse_settings("").unwrap(), Settings::default());
    assert_eq!(parse_settings("  \n").unwrap(), Settings::default());
}

#[test]
#[serial]
fn test_load_config_env_overrides_file() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(
        config_file.path(),
        "upload_url: \"http://from-file/data.php\"\n",
    )
    .unwrap();

    env::set_var(ENV_UPLOAD_URL, "http://from-env/data.php");
    env::set_var(ENV_QUERY_URL, "http://from-env/query.php");
    env::set_var(ENV_INFO_FILE, "/tmp/env-pfl.info");

    let settings = load_config(Some(config_file.path()));
    clear_env();
    let settings = settings.expect("Config should load");

    assert_eq!(settings.upload_url, "http://from-env/data.php");
    assert_eq!(settings.query_url, "http://from-env/query.php");
    assert_eq!(settings.info_file(), PathBuf::from("/tmp/env-pfl.info"));
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_explicit_file() {
    clear_env();
    let err = load_config(Some(std::path::Path::new("/nonexistent/pfl.yaml"))).unwrap_err();
    assert!(
        err.to_string().contains("Failed to read config file"),
        "got: {err}"
    );
}

/// This test ensures that if the config file is not valid YAML, load_config errors and reports as such.
#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();

    let err = load_config(Some(config_file.path())).unwrap_err();
    let msg = format!("{err:#}");
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_rejects_unknown_keys() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "upload_uri: \"typo\"\n").unwrap();

    let err = load_config(Some(config_file.path())).unwrap_err();
    assert!(format!("{err:#}").contains("upload_uri"), "got: {err:#}");
}

/// `load_config` module: loads the optional YAML config file into [`Settings`],
/// then applies environment overrides.
///
/// # Responsibilities
/// - Locate the config file: an explicit `--config` path must exist; otherwise
///   `/etc/pfl/pfl.yaml` is used when present, and built-in defaults when not.
/// - Parse YAML into the strongly-typed [`Settings`] (unknown keys are rejected).
/// - Apply `PFL_UPLOAD_URL`, `PFL_QUERY_URL` and `PFL_INFO_FILE` from the
///   environment (a `.env` file is honoured).
///
/// # Errors
/// All errors use `anyhow::Error` with the offending path in context, and are
/// surfaced at the CLI boundary.
use anyhow::{Context, Result};
use pfl_core::config::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/pfl/pfl.yaml";

pub const ENV_UPLOAD_URL: &str = "PFL_UPLOAD_URL";
pub const ENV_QUERY_URL: &str = "PFL_QUERY_URL";
pub const ENV_INFO_FILE: &str = "PFL_INFO_FILE";

/// Parse a YAML document; an empty document yields the defaults.
pub fn parse_settings(content: &str) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_yaml::from_str(content).context("Failed to parse config YAML")?;
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(url) = std::env::var(ENV_UPLOAD_URL) {
        info!(url = %url, "Upload URL overridden from environment");
        settings.upload_url = url;
    }
    if let Ok(url) = std::env::var(ENV_QUERY_URL) {
        info!(url = %url, "Query URL overridden from environment");
        settings.query_url = url;
    }
    if let Ok(path) = std::env::var(ENV_INFO_FILE) {
        info!(path = %path, "Info file overridden from environment");
        settings.info_file = Some(PathBuf::from(path));
    }
}

/// Loads settings from `path` (or the default location) and the environment.
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    dotenvy::dotenv().ok();

    let path: Option<PathBuf> = match path {
        Some(explicit) => Some(explicit.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.is_file().then_some(default)
        }
    };

    let mut settings = match &path {
        Some(path_ref) => {
            info!(config_path = ?path_ref, "Loading configuration from file");
            let content = fs::read_to_string(path_ref).map_err(|e| {
                error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
                anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
            })?;
            parse_settings(&content).with_context(|| format!("in {}", path_ref.display()))?
        }
        None => {
            info!("No config file, using defaults");
            Settings::default()
        }
    };

    apply_env_overrides(&mut settings);
    settings.trace_loaded();
    Ok(settings)
}

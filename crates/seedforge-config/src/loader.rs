//! YAML loading with `${VAR}` expansion and environment overrides.
//!
//! # Design
//! - Expansion runs on the raw text so any scalar can reference the environment.
//! - Overrides apply after parsing and before validation.
//! - Environment access goes through a lookup closure so tests stay hermetic.

use std::io;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use tracing::{debug, info};
use url::Url;

use crate::defaults::DEFAULT_CONFIG_PATH;
use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;
use crate::validate::validate_settings;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SEEDFORGE_CONFIG";

const ENV_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}";

/// Configuration path from `SEEDFORGE_CONFIG`, falling back to the default location.
#[must_use]
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Replace `${VAR}` and `${VAR:-default}` references using `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnv`] for an unset variable without a default.
pub fn expand_env<F>(raw: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = Regex::new(ENV_PATTERN).map_err(|source| ConfigError::Pattern { source })?;
    let mut missing = None;
    let expanded = pattern.replace_all(raw, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (lookup(name), caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(ConfigError::MissingEnv { name }),
        None => Ok(expanded.into_owned()),
    }
}

/// Parse settings from YAML text after expansion.
///
/// # Errors
///
/// Returns expansion or YAML errors.
pub fn parse_settings<F>(raw: &str, lookup: F) -> ConfigResult<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_env(raw, lookup)?;
    if expanded.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&expanded).map_err(|source| ConfigError::Parse { source })
}

/// Apply the `SEEDFORGE_*` overrides.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when an override cannot be interpreted.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("SEEDFORGE_QBIT_URL") {
        apply_qbit_url(settings, &raw)?;
    }
    if let Some(username) = lookup("SEEDFORGE_QBIT_USERNAME") {
        settings.qbittorrent.username = username;
    }
    if let Some(password) = lookup("SEEDFORGE_QBIT_PASSWORD") {
        settings.qbittorrent.password = password;
    }
    if let Some(bind) = lookup("SEEDFORGE_BIND") {
        apply_bind(settings, &bind)?;
    }
    if let Some(level) = lookup("SEEDFORGE_LOG_LEVEL") {
        settings.logging.level = level;
    }
    Ok(())
}

fn apply_qbit_url(settings: &mut Settings, raw: &str) -> ConfigResult<()> {
    let invalid = |reason| {
        ConfigError::invalid(
            "qbittorrent",
            "SEEDFORGE_QBIT_URL",
            Some(raw.to_string()),
            reason,
        )
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid("must_be_a_url"))?;
    let use_https = match url.scheme() {
        "http" => false,
        "https" => true,
        _ => return Err(invalid("scheme_must_be_http_or_https")),
    };
    let host = url.host_str().ok_or_else(|| invalid("host_required"))?;
    let qbit = &mut settings.qbittorrent;
    qbit.use_https = use_https;
    qbit.host = host.to_string();
    qbit.port = url.port_or_known_default().unwrap_or(qbit.port);
    qbit.base_path = url.path().trim_matches('/').to_string();
    Ok(())
}

fn apply_bind(settings: &mut Settings, raw: &str) -> ConfigResult<()> {
    let invalid = || {
        ConfigError::invalid(
            "web_server",
            "SEEDFORGE_BIND",
            Some(raw.to_string()),
            "must_be_host_colon_port",
        )
    };
    let (host, port) = raw.trim().rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid());
    }
    settings.web_server.host = host.to_string();
    settings.web_server.port = port;
    Ok(())
}

/// Load, expand, override and validate settings from `path`.
///
/// A missing file yields defaults (still subject to overrides and validation).
///
/// # Errors
///
/// Returns IO, expansion, parse or validation errors.
pub async fn load_settings<F>(path: &Path, lookup: F) -> ConfigResult<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            debug!(path = %path.display(), "loading configuration file");
            parse_settings(&raw, &lookup)?
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "configuration file not found; using defaults");
            Settings::default()
        }
        Err(source) => {
            return Err(ConfigError::Io {
                operation: "config.read",
                path: path.to_path_buf(),
                source,
            });
        }
    };
    apply_env_overrides(&mut settings, &lookup)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Process environment lookup used outside tests.
#[must_use]
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

//! Validation helpers for configuration documents.

use std::path::Path;

use seedforge_core::{DiagnosticLevel, MappingDiagnostic, is_valid_piece_size};

use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;

/// Check every section, returning the first violation.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the section and field that failed, or
/// [`ConfigError::Mapping`] when the path mapping table is unusable.
pub fn validate_settings(settings: &Settings) -> ConfigResult<()> {
    let qbit = &settings.qbittorrent;
    if qbit.host.trim().is_empty() {
        return Err(ConfigError::invalid("qbittorrent", "host", None, "required"));
    }
    validate_port("qbittorrent", "port", qbit.port)?;
    ensure_positive("qbittorrent", "connection_timeout_secs", qbit.connection_timeout_secs)?;
    ensure_positive("qbittorrent", "read_timeout_secs", qbit.read_timeout_secs)?;
    qbit.path_mapper()?;

    let creation = &settings.torrent_creation;
    ensure_positive("torrent_creation", "poll_interval_secs", creation.poll_interval_secs)?;
    ensure_positive("torrent_creation", "timeout_secs", creation.timeout_secs)?;
    if creation.poll_interval_secs >= creation.timeout_secs {
        return Err(ConfigError::invalid(
            "torrent_creation",
            "poll_interval_secs",
            Some(creation.poll_interval_secs.to_string()),
            "must_be_less_than_timeout",
        ));
    }
    ensure_positive("torrent_creation", "target_piece_count", creation.target_piece_count)?;
    if let Some(size) = creation.piece_size
        && !is_valid_piece_size(size)
    {
        return Err(ConfigError::invalid(
            "torrent_creation",
            "piece_size",
            Some(size.to_string()),
            "must_be_power_of_two_between_16k_and_16m",
        ));
    }
    if creation.optimize_alignment && creation.padded_file_size_limit.is_none() {
        return Err(ConfigError::invalid(
            "torrent_creation",
            "padded_file_size_limit",
            None,
            "required_with_alignment",
        ));
    }
    if creation.trackers.iter().any(Vec::is_empty) {
        return Err(ConfigError::invalid(
            "torrent_creation",
            "trackers",
            None,
            "empty_tier",
        ));
    }

    let scanning = &settings.scanning;
    if scanning.max_entries_per_directory == 0 {
        return Err(ConfigError::invalid(
            "scanning",
            "max_entries_per_directory",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    if scanning.max_depth == 0 {
        return Err(ConfigError::invalid(
            "scanning",
            "max_depth",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }

    if settings.web_server.host.trim().is_empty() {
        return Err(ConfigError::invalid("web_server", "host", None, "required"));
    }
    validate_port("web_server", "port", settings.web_server.port)?;

    if let Some(format) = settings.logging.format.as_deref()
        && !matches!(format, "json" | "pretty")
    {
        return Err(ConfigError::invalid(
            "logging",
            "format",
            Some(format.to_string()),
            "must_be_json_or_pretty",
        ));
    }

    Ok(())
}

/// Mapping diagnostics plus a warning for each host prefix missing on this machine.
///
/// # Errors
///
/// Returns [`ConfigError::Mapping`] when the table cannot be built.
pub fn mapping_diagnostics(settings: &Settings) -> ConfigResult<Vec<MappingDiagnostic>> {
    let mapper = settings.qbittorrent.path_mapper()?;
    let mut findings = mapper.diagnostics();
    for mapping in mapper.mappings() {
        if !Path::new(&mapping.host).exists() {
            findings.push(MappingDiagnostic {
                level: DiagnosticLevel::Warning,
                code: "missing_host_path",
                message: format!("host prefix {} does not exist locally", mapping.host),
            });
        }
    }
    Ok(findings)
}

fn validate_port(section: &'static str, field: &'static str, port: u16) -> ConfigResult<()> {
    if port == 0 {
        return Err(ConfigError::invalid(
            section,
            field,
            Some("0".to_string()),
            "must_be_between_1_and_65535",
        ));
    }
    Ok(())
}

fn ensure_positive(section: &'static str, field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid(
            section,
            field,
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedforge_core::PathMapping;

    #[test]
    fn defaults_validate() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn poll_interval_must_be_below_timeout() {
        let mut settings = Settings::default();
        settings.torrent_creation.poll_interval_secs = 300;
        let err = validate_settings(&settings).err();
        assert!(matches!(
            err,
            Some(ConfigError::InvalidField {
                section: "torrent_creation",
                field: "poll_interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn invalid_piece_size_is_rejected() {
        let mut settings = Settings::default();
        settings.torrent_creation.piece_size = Some(3_000);
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::InvalidField {
                field: "piece_size",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_mappings_are_rejected() {
        let mut settings = Settings::default();
        settings.qbittorrent.path_mappings = vec![
            PathMapping::new("/mnt/a", "/data"),
            PathMapping::new("/mnt/b", "/data"),
        ];
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::Mapping { .. })
        ));
    }

    #[test]
    fn zero_port_and_blank_host_are_rejected() {
        let mut settings = Settings::default();
        settings.web_server.port = 0;
        assert!(validate_settings(&settings).is_err());
        let mut settings = Settings::default();
        settings.qbittorrent.host = " ".into();
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::InvalidField {
                section: "qbittorrent",
                field: "host",
                ..
            })
        ));
    }

    #[test]
    fn missing_host_prefix_is_reported() -> ConfigResult<()> {
        let mut settings = Settings::default();
        settings.qbittorrent.path_mappings =
            vec![PathMapping::new("/definitely/not/here/seedforge", "/data")];
        let findings = mapping_diagnostics(&settings)?;
        assert!(findings.iter().any(|f| f.code == "missing_host_path"));
        Ok(())
    }
}

//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use seedforge_core::MappingError;
use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// `${VAR}` referenced an unset variable without a default.
    #[error("environment variable referenced by configuration is not set")]
    MissingEnv {
        /// Variable name.
        name: String,
    },
    /// The document was not valid YAML for the settings model.
    #[error("configuration document could not be parsed")]
    Parse {
        /// Source YAML error.
        #[source]
        source: serde_yaml::Error,
    },
    /// Path mappings were rejected.
    #[error("invalid path mapping")]
    Mapping {
        /// Source mapping error.
        #[source]
        source: MappingError,
    },
    /// Environment expansion pattern failed to compile.
    #[error("failed to compile environment expansion pattern")]
    Pattern {
        /// Source regex error.
        #[source]
        source: regex::Error,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path being accessed.
        path: PathBuf,
        /// Source IO error.
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

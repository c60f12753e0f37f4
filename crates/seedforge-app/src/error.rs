//! # Design
//!
//! - Centralize application-level errors for bootstrap and wiring.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedforge_config::ConfigError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: seedforge_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedforge_telemetry::TelemetryError,
    },
    /// The remote client could not be constructed.
    #[error("remote client setup failed")]
    Remote {
        /// Operation identifier.
        operation: &'static str,
        /// Source client error.
        source: seedforge_qbit::QbitError,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seedforge_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: seedforge_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedforge_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn remote(operation: &'static str, source: seedforge_qbit::QbitError) -> Self {
        Self::Remote { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn app_error_helpers_build_variants() -> Result<(), Box<dyn Error>> {
        let Err(utf8_error) = String::from_utf8(vec![0xff_u8]) else {
            return Err(io::Error::other("expected invalid utf-8").into());
        };
        let config = AppError::config(
            "load",
            seedforge_config::ConfigError::MissingEnv {
                name: "QBIT_PASSWORD".to_string(),
            },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let api = AppError::api_server(
            "serve",
            seedforge_api::ApiServerError::Serve {
                source: io::Error::other("io"),
            },
        );
        assert!(matches!(api, AppError::ApiServer { .. }));

        let telemetry = AppError::telemetry(
            "init",
            seedforge_telemetry::TelemetryError::MetricsUtf8 { source: utf8_error },
        );
        assert!(matches!(telemetry, AppError::Telemetry { .. }));

        let remote = AppError::remote("qbit.new", seedforge_qbit::QbitError::LoginRejected);
        assert_eq!(remote.to_string(), "remote client setup failed");
        assert!(remote.source().is_some());
        Ok(())
    }
}

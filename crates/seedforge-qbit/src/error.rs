//! Error type for the qBittorrent WebUI client.
//!
//! # Design
//! - Transport and HTTP status details stay inside this crate.
//! - Conversions into [`RemoteError`] and [`ListingError`] are the only way failures leave it.

use seedforge_core::{ListingError, RemoteError};
use thiserror::Error;

/// Failures raised while talking to qBittorrent.
#[derive(Debug, Error)]
pub enum QbitError {
    /// Base URL could not be parsed.
    #[error("invalid qBittorrent base URL")]
    InvalidBaseUrl {
        /// Offending value.
        value: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuild {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// Request could not be sent or the response body could not be read.
    #[error("qBittorrent request failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// Login answered `Fails.`.
    #[error("qBittorrent rejected the credentials")]
    LoginRejected,
    /// Login answered 403 after too many failed attempts.
    #[error("qBittorrent banned this client address")]
    Banned,
    /// An authenticated call answered 403.
    #[error("qBittorrent session expired")]
    SessionExpired {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Creator queue is full.
    #[error("qBittorrent has too many creation tasks")]
    TooManyTasks,
    /// Creator cannot see the source path.
    #[error("qBittorrent cannot find the source path")]
    SourceNotFound {
        /// Path as sent to qBittorrent.
        path: String,
    },
    /// Creator rejected one or more parameters.
    #[error("qBittorrent rejected the creation parameters")]
    BadParameters {
        /// Response body.
        detail: String,
    },
    /// Creator has no task with this identifier.
    #[error("qBittorrent creation task not found")]
    TaskNotFound {
        /// Task identifier.
        task_id: String,
    },
    /// Directory listing target does not exist.
    #[error("qBittorrent directory not found")]
    DirectoryNotFound {
        /// Requested directory.
        path: String,
    },
    /// Unexpected HTTP status.
    #[error("unexpected qBittorrent response status")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Response body did not have the expected shape.
    #[error("failed to decode qBittorrent response")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Decoder message.
        detail: String,
    },
}

/// Convenience alias for qBittorrent client results.
pub type QbitResult<T> = Result<T, QbitError>;

impl QbitError {
    pub(crate) const fn transport(operation: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { operation, source }
    }

    /// Convert into a listing failure for `path`.
    #[must_use]
    pub fn into_listing(self, path: &str) -> ListingError {
        match self {
            Self::DirectoryNotFound { path } => ListingError::NotFound { path },
            Self::SessionExpired { .. } | Self::Banned | Self::LoginRejected => {
                ListingError::PermissionDenied {
                    path: path.to_string(),
                }
            }
            other => ListingError::Unavailable {
                operation: other.operation(),
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }

    const fn operation(&self) -> &'static str {
        match self {
            Self::Transport { operation, .. }
            | Self::SessionExpired { operation }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. } => operation,
            Self::InvalidBaseUrl { .. } | Self::ClientBuild { .. } => "client.build",
            Self::LoginRejected | Self::Banned => "auth.login",
            Self::TooManyTasks | Self::SourceNotFound { .. } | Self::BadParameters { .. } => {
                "creator.add_task"
            }
            Self::TaskNotFound { .. } => "creator.task",
            Self::DirectoryNotFound { .. } => "app.directory_content",
        }
    }
}

impl From<QbitError> for RemoteError {
    fn from(error: QbitError) -> Self {
        match error {
            QbitError::Transport { operation, source } => Self::Connection {
                operation,
                source: Box::new(source),
            },
            QbitError::LoginRejected => Self::Unauthorized {
                reason: "bad_credentials",
            },
            QbitError::Banned => Self::Unauthorized { reason: "banned" },
            QbitError::SessionExpired { .. } => Self::Unauthorized {
                reason: "session_expired",
            },
            QbitError::TooManyTasks => Self::Busy,
            QbitError::SourceNotFound { path } | QbitError::DirectoryNotFound { path } => {
                Self::PathNotFound { path }
            }
            QbitError::BadParameters { detail } => Self::UnsupportedParameters { detail },
            QbitError::TaskNotFound { task_id } => Self::TaskNotFound { task_id },
            QbitError::Status {
                operation,
                status,
                body,
            } => Self::Protocol {
                operation,
                status: Some(status),
                detail: body,
            },
            QbitError::Decode { operation, detail } => Self::Protocol {
                operation,
                status: None,
                detail,
            },
            other @ (QbitError::InvalidBaseUrl { .. } | QbitError::ClientBuild { .. }) => {
                Self::Protocol {
                    operation: "client.build",
                    status: None,
                    detail: other.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_failures_map_to_remote_taxonomy() {
        assert!(matches!(
            RemoteError::from(QbitError::TooManyTasks),
            RemoteError::Busy
        ));
        assert!(matches!(
            RemoteError::from(QbitError::SourceNotFound { path: "/data/x".into() }),
            RemoteError::PathNotFound { path } if path == "/data/x"
        ));
        assert!(matches!(
            RemoteError::from(QbitError::BadParameters { detail: "bad".into() }),
            RemoteError::UnsupportedParameters { .. }
        ));
        assert!(matches!(
            RemoteError::from(QbitError::Banned),
            RemoteError::Unauthorized { reason: "banned" }
        ));
        assert!(matches!(
            RemoteError::from(QbitError::Status {
                operation: "creator.status",
                status: 500,
                body: "boom".into(),
            }),
            RemoteError::Protocol { status: Some(500), .. }
        ));
    }

    #[test]
    fn listing_conversion_keeps_path() {
        let missing = QbitError::DirectoryNotFound {
            path: "/data".into(),
        }
        .into_listing("/data");
        assert!(matches!(missing, ListingError::NotFound { path } if path == "/data"));

        let expired = QbitError::SessionExpired {
            operation: "app.directory_content",
        }
        .into_listing("/data");
        assert!(matches!(expired, ListingError::PermissionDenied { .. }));

        let other = QbitError::Decode {
            operation: "app.directory_content",
            detail: "eof".into(),
        }
        .into_listing("/data");
        assert!(matches!(
            other,
            ListingError::Unavailable {
                operation: "app.directory_content",
                ..
            }
        ));
    }
}

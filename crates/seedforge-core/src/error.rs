//! Error types for torrent creation services.
//!
//! # Design
//! - Messages are constant per variant so callers can render kinds distinctly.
//! - Context (paths, task identifiers, remote text) travels in structured fields.
//! - Transport failures are translated into [`RemoteError`] by client adapters and never
//!   cross this boundary raw.

use std::error::Error;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Boxed error used where adapters wrap foreign failures.
pub type BoxedError = Box<dyn Error + Send + Sync>;

/// Failures raised by the piece size calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PieceSizeError {
    /// Manual piece size was not a power of two within the supported range.
    #[error("invalid piece size")]
    InvalidPieceSize {
        /// Rejected piece size in bytes.
        value: u64,
    },
    /// An argument was outside its accepted domain.
    #[error("invalid piece size argument")]
    InvalidArgument {
        /// Argument name.
        field: &'static str,
        /// Rejected value.
        value: u64,
    },
}

/// Failures raised while building a path mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A prefix was blank.
    #[error("path mapping prefix is empty")]
    EmptyPrefix {
        /// Side of the mapping (`host` or `remote`).
        side: &'static str,
    },
    /// A prefix was not absolute.
    #[error("path mapping prefix is not absolute")]
    RelativePrefix {
        /// Side of the mapping (`host` or `remote`).
        side: &'static str,
        /// Offending prefix.
        value: String,
    },
    /// Two mappings share an identical prefix, so longest-prefix selection is ambiguous.
    #[error("path mapping prefix is ambiguous")]
    AmbiguousPrefix {
        /// Side of the mapping (`host` or `remote`).
        side: &'static str,
        /// Duplicated prefix.
        prefix: String,
    },
}

/// Failures raised by directory listing capabilities.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Path does not exist.
    #[error("path not found")]
    NotFound {
        /// Missing path.
        path: String,
    },
    /// Path exists but cannot be read.
    #[error("permission denied")]
    PermissionDenied {
        /// Unreadable path.
        path: String,
    },
    /// A directory listing was requested for a non-directory.
    #[error("path is not a directory")]
    NotADirectory {
        /// Offending path.
        path: String,
    },
    /// The listing backend failed for another reason.
    #[error("directory listing unavailable")]
    Unavailable {
        /// Operation identifier.
        operation: &'static str,
        /// Path being listed.
        path: String,
        /// Underlying failure.
        #[source]
        source: BoxedError,
    },
}

/// Failures reported by a remote torrent client, already translated from transport errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Remote client refused new work because too many tasks are active.
    #[error("remote client is busy")]
    Busy,
    /// Remote process cannot see the supplied path.
    #[error("remote path not found")]
    PathNotFound {
        /// Path as seen by the remote process.
        path: String,
    },
    /// Credentials were rejected or the session expired.
    #[error("remote client rejected credentials")]
    Unauthorized {
        /// Machine-readable reason (`bad_credentials`, `banned`, `session_expired`).
        reason: &'static str,
    },
    /// The remote client could not be reached.
    #[error("remote client unreachable")]
    Connection {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: BoxedError,
    },
    /// Remote rejected one or more request parameters.
    #[error("remote client rejected parameters")]
    UnsupportedParameters {
        /// Response text returned by the remote client.
        detail: String,
    },
    /// Remote has no task with the given identifier.
    #[error("remote task not found")]
    TaskNotFound {
        /// Task identifier.
        task_id: String,
    },
    /// Remote responded with something the client cannot interpret.
    #[error("remote protocol error")]
    Protocol {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status when available.
        status: Option<u16>,
        /// Response text or decode failure.
        detail: String,
    },
}

/// Failures raised while inspecting `.torrent` metainfo.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// Payload was not valid bencode.
    #[error("metainfo decode failed")]
    Decode {
        /// Underlying bencode error.
        #[source]
        source: serde_bencode::Error,
    },
    /// Payload had no `info` dictionary.
    #[error("metainfo is missing the info dictionary")]
    MissingInfo,
}

/// Coarse error classification surfaced to API and CLI consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request failed validation.
    Validation,
    /// Manual piece size was rejected.
    InvalidPieceSize,
    /// Local path missing.
    NotFound,
    /// Local path unreadable.
    PermissionDenied,
    /// Remote process cannot see the translated path.
    RemotePathNotFound,
    /// Remote client is at capacity.
    Busy,
    /// Remote client rejected credentials.
    Unauthorized,
    /// Remote client unreachable.
    Connection,
    /// Remote client rejected parameters even after the minimal retry.
    UnsupportedParameters,
    /// Polling exceeded the maximum wait.
    Timeout,
    /// Remote task failed.
    Failed,
    /// Caller cancelled the creation.
    Cancelled,
    /// Remote protocol failure.
    Remote,
}

impl ErrorKind {
    /// Stable machine-readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::InvalidPieceSize => "invalid_piece_size",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::RemotePathNotFound => "remote_path_not_found",
            Self::Busy => "busy",
            Self::Unauthorized => "unauthorized",
            Self::Connection => "connection",
            Self::UnsupportedParameters => "unsupported_parameters",
            Self::Timeout => "timeout",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Remote => "remote",
        }
    }
}

/// Primary error type for torrent creation.
#[derive(Debug, Error)]
pub enum CreationError {
    /// Request failed validation before any remote call.
    #[error("creation request is invalid")]
    Validation {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Manual piece size was rejected.
    #[error("piece size must be a power of two between 16 KiB and 16 MiB")]
    InvalidPieceSize {
        /// Rejected value in bytes.
        value: u64,
    },
    /// Local path does not exist.
    #[error("path not found")]
    NotFound {
        /// Missing path.
        path: String,
    },
    /// Local path cannot be read.
    #[error("permission denied")]
    PermissionDenied {
        /// Unreadable path.
        path: String,
    },
    /// Remote process cannot see the translated path.
    #[error("remote client cannot see the source path")]
    RemotePathNotFound {
        /// Translated path submitted to the remote client.
        path: String,
    },
    /// Remote client has too many active tasks; retry later.
    #[error("remote client is busy, try again later")]
    Busy,
    /// Remote client rejected the configured credentials.
    #[error("remote client rejected credentials")]
    Unauthorized {
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// Remote client could not be reached.
    #[error("remote client unreachable")]
    Connection {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxedError,
    },
    /// Remote client rejected the parameter set, including the minimal retry.
    #[error("remote client rejected the creation parameters")]
    UnsupportedParameters {
        /// Remote response text.
        detail: String,
    },
    /// Polling exceeded the maximum wait; the remote task may still complete.
    #[error("torrent creation timed out")]
    Timeout {
        /// Remote task identifier left in place for later inspection.
        task_id: String,
        /// Seconds spent polling.
        waited_secs: u64,
    },
    /// Remote task reached the failed state.
    #[error("torrent creation failed")]
    Failed {
        /// Remote task identifier.
        task_id: String,
        /// Remote error message, verbatim.
        message: String,
    },
    /// Creation was cancelled by the caller.
    #[error("torrent creation cancelled")]
    Cancelled {
        /// Remote task identifier when submission had happened.
        task_id: Option<String>,
    },
    /// Remote protocol failure that fits no other kind.
    #[error("remote client returned an unexpected response")]
    Remote {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status when available.
        status: Option<u16>,
        /// Response text or decode failure.
        detail: String,
    },
}

impl CreationError {
    /// Classification used by delivery surfaces.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidPieceSize { .. } => ErrorKind::InvalidPieceSize,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::RemotePathNotFound { .. } => ErrorKind::RemotePathNotFound,
            Self::Busy => ErrorKind::Busy,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::UnsupportedParameters { .. } => ErrorKind::UnsupportedParameters,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Failed { .. } => ErrorKind::Failed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Remote { .. } => ErrorKind::Remote,
        }
    }

    /// Remote task identifier carried by the error, if any.
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Timeout { task_id, .. } | Self::Failed { task_id, .. } => Some(task_id),
            Self::Cancelled { task_id } => task_id.as_deref(),
            _ => None,
        }
    }

    /// Context string suitable for user display next to the constant message.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Validation {
                field,
                reason,
                value,
            } => Some(value.as_ref().map_or_else(
                || format!("{field}: {reason}"),
                |value| format!("{field}: {reason} ({value})"),
            )),
            Self::InvalidPieceSize { value } => Some(format!("{value} bytes")),
            Self::NotFound { path }
            | Self::PermissionDenied { path }
            | Self::RemotePathNotFound { path } => Some(path.clone()),
            Self::Unauthorized { reason } => Some((*reason).to_string()),
            Self::Connection { source, .. } => Some(source.to_string()),
            Self::UnsupportedParameters { detail } | Self::Remote { detail, .. } => {
                Some(detail.clone())
            }
            Self::Timeout {
                task_id,
                waited_secs,
            } => Some(format!("task {task_id} still running after {waited_secs}s")),
            Self::Failed { message, .. } => Some(message.clone()),
            Self::Busy | Self::Cancelled { .. } => None,
        }
    }
}

impl From<PieceSizeError> for CreationError {
    fn from(error: PieceSizeError) -> Self {
        match error {
            PieceSizeError::InvalidPieceSize { value } => Self::InvalidPieceSize { value },
            PieceSizeError::InvalidArgument { field, value } => Self::Validation {
                field,
                reason: "must_be_positive",
                value: Some(value.to_string()),
            },
        }
    }
}

impl From<RemoteError> for CreationError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Busy => Self::Busy,
            RemoteError::PathNotFound { path } => Self::RemotePathNotFound { path },
            RemoteError::Unauthorized { reason } => Self::Unauthorized { reason },
            RemoteError::Connection { operation, source } => Self::Connection { operation, source },
            RemoteError::UnsupportedParameters { detail } => Self::UnsupportedParameters { detail },
            RemoteError::TaskNotFound { task_id } => Self::Remote {
                operation: "task_lookup",
                status: Some(404),
                detail: format!("task {task_id} is unknown to the remote client"),
            },
            RemoteError::Protocol {
                operation,
                status,
                detail,
            } => Self::Remote {
                operation,
                status,
                detail,
            },
        }
    }
}

impl From<ListingError> for CreationError {
    fn from(error: ListingError) -> Self {
        match error {
            ListingError::NotFound { path } => Self::NotFound { path },
            ListingError::PermissionDenied { path } => Self::PermissionDenied { path },
            ListingError::NotADirectory { path } => Self::Validation {
                field: "path",
                reason: "not_a_directory",
                value: Some(path),
            },
            ListingError::Unavailable {
                operation, source, ..
            } => Self::Connection { operation, source },
        }
    }
}

/// Failures raised by the background creation workflow.
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with the identifier is tracked.
    #[error("creation job not found")]
    UnknownJob {
        /// Requested job identifier.
        job_id: Uuid,
    },
    /// The job has not produced an artifact.
    #[error("creation job has no artifact")]
    ArtifactUnavailable {
        /// Job identifier.
        job_id: Uuid,
        /// Current job state label.
        state: &'static str,
    },
    /// The request was rejected before the job started.
    #[error("creation request rejected")]
    Rejected {
        /// Validation failure.
        #[source]
        source: CreationError,
    },
}

impl From<CreationError> for JobError {
    fn from(source: CreationError) -> Self {
        Self::Rejected { source }
    }
}

/// Convenience alias for creation results.
pub type CreationResult<T> = Result<T, CreationError>;

/// Convenience alias for remote client results.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Convenience alias for listing results.
pub type ListingResult<T> = Result<T, ListingError>;

/// Convenience alias for workflow results.
pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn remote_errors_translate_to_distinct_kinds() {
        let cases = vec![
            (RemoteError::Busy, ErrorKind::Busy),
            (
                RemoteError::PathNotFound {
                    path: "/data/x".into(),
                },
                ErrorKind::RemotePathNotFound,
            ),
            (
                RemoteError::Unauthorized {
                    reason: "bad_credentials",
                },
                ErrorKind::Unauthorized,
            ),
            (
                RemoteError::Connection {
                    operation: "login",
                    source: Box::new(io::Error::other("refused")),
                },
                ErrorKind::Connection,
            ),
            (
                RemoteError::TaskNotFound {
                    task_id: "t".into(),
                },
                ErrorKind::Remote,
            ),
        ];
        for (remote, expected) in cases {
            assert_eq!(CreationError::from(remote).kind(), expected);
        }
    }

    #[test]
    fn remote_path_not_found_keeps_translated_path() {
        let err = CreationError::from(RemoteError::PathNotFound {
            path: "/data/movies".into(),
        });
        assert_eq!(err.detail().as_deref(), Some("/data/movies"));
        assert_eq!(err.to_string(), "remote client cannot see the source path");
    }

    #[test]
    fn messages_are_distinct_per_kind() {
        let busy = CreationError::Busy.to_string();
        let missing = CreationError::NotFound { path: "/x".into() }.to_string();
        let timeout = CreationError::Timeout {
            task_id: "t".into(),
            waited_secs: 300,
        }
        .to_string();
        assert_ne!(busy, missing);
        assert_ne!(missing, timeout);
        assert_ne!(busy, timeout);
    }

    #[test]
    fn task_id_is_exposed_for_timeout_and_cancel() {
        let timeout = CreationError::Timeout {
            task_id: "abc".into(),
            waited_secs: 1,
        };
        assert_eq!(timeout.task_id(), Some("abc"));
        let cancelled = CreationError::Cancelled { task_id: None };
        assert_eq!(cancelled.task_id(), None);
        assert_eq!(ErrorKind::Timeout.as_str(), "timeout");
    }
}

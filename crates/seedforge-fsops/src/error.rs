//! # Design
//!
//! - Provide structured, constant-message errors for scanning and browsing.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use seedforge_core::ListingError;
use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while scanning or browsing paths.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// Path does not exist.
    #[error("fsops path not found")]
    NotFound {
        /// Missing path.
        path: String,
    },
    /// Path exists but cannot be read.
    #[error("fsops permission denied")]
    PermissionDenied {
        /// Unreadable path.
        path: String,
    },
    /// A directory operation targeted something else.
    #[error("fsops path is not a directory")]
    NotADirectory {
        /// Offending path.
        path: String,
    },
    /// The lister failed for another reason.
    #[error("fsops listing failure")]
    Listing {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path being listed.
        path: String,
        /// Underlying listing error.
        #[source]
        source: ListingError,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn listing(operation: &'static str, path: &str, source: ListingError) -> Self {
        match source {
            ListingError::NotFound { path } => Self::NotFound { path },
            ListingError::PermissionDenied { path } => Self::PermissionDenied { path },
            ListingError::NotADirectory { path } => Self::NotADirectory { path },
            source @ ListingError::Unavailable { .. } => Self::Listing {
                operation,
                path: path.to_string(),
                source,
            },
        }
    }
}

impl From<FsOpsError> for ListingError {
    fn from(error: FsOpsError) -> Self {
        match error {
            FsOpsError::NotFound { path } => Self::NotFound { path },
            FsOpsError::PermissionDenied { path } => Self::PermissionDenied { path },
            FsOpsError::NotADirectory { path } => Self::NotADirectory { path },
            FsOpsError::Listing { source, .. } => source,
            invalid @ FsOpsError::InvalidInput { .. } => Self::Unavailable {
                operation: "fsops.input",
                path: String::new(),
                source: Box::new(invalid),
            },
        }
    }
}

//! RFC9457-style API error wrapper and domain error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seedforge_api_models::{ProblemDetails, ProblemInvalidParam};
use seedforge_config::ConfigError;
use seedforge_core::{
    CreationError, ErrorKind, JobError, ListingError, PieceSizeError, RemoteError,
};
use seedforge_telemetry::{current_request_id, current_route};
use tracing::warn;

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_BUSY, PROBLEM_CONFIG_INVALID, PROBLEM_CONFLICT,
    PROBLEM_CONNECTION, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND, PROBLEM_PERMISSION_DENIED,
    PROBLEM_REMOTE, PROBLEM_REMOTE_PATH_NOT_FOUND, PROBLEM_TIMEOUT, PROBLEM_UNAUTHORIZED,
    PROBLEM_UNSUPPORTED, PROBLEM_VALIDATION,
};

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    invalid_params: Option<Vec<ProblemInvalidParam>>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            invalid_params: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn with_optional_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    fn with_invalid_param(mut self, field: &str, message: impl Into<String>) -> Self {
        self.invalid_params = Some(vec![ProblemInvalidParam {
            pointer: format!("/{field}"),
            message: message.into(),
        }]);
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn config_invalid(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_CONFIG_INVALID,
            "configuration invalid",
        )
        .with_detail(detail)
    }

    #[cfg(test)]
    pub(crate) const fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub(crate) const fn kind(&self) -> &'static str {
        self.kind
    }

    #[cfg(test)]
    pub(crate) fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

const fn problem_for(kind: ErrorKind) -> (StatusCode, &'static str, &'static str) {
    match kind {
        ErrorKind::Validation => (
            StatusCode::BAD_REQUEST,
            PROBLEM_VALIDATION,
            "request validation failed",
        ),
        ErrorKind::InvalidPieceSize => (
            StatusCode::BAD_REQUEST,
            PROBLEM_VALIDATION,
            "invalid piece size",
        ),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, PROBLEM_NOT_FOUND, "path not found"),
        ErrorKind::PermissionDenied => (
            StatusCode::FORBIDDEN,
            PROBLEM_PERMISSION_DENIED,
            "permission denied",
        ),
        ErrorKind::RemotePathNotFound => (
            StatusCode::NOT_FOUND,
            PROBLEM_REMOTE_PATH_NOT_FOUND,
            "remote client cannot see the path",
        ),
        ErrorKind::Busy => (
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_BUSY,
            "remote client is busy",
        ),
        ErrorKind::Unauthorized => (
            StatusCode::BAD_GATEWAY,
            PROBLEM_UNAUTHORIZED,
            "remote client rejected credentials",
        ),
        ErrorKind::Connection => (
            StatusCode::BAD_GATEWAY,
            PROBLEM_CONNECTION,
            "remote client unreachable",
        ),
        ErrorKind::UnsupportedParameters => (
            StatusCode::UNPROCESSABLE_ENTITY,
            PROBLEM_UNSUPPORTED,
            "remote client rejected the parameters",
        ),
        ErrorKind::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            PROBLEM_TIMEOUT,
            "torrent creation timed out",
        ),
        ErrorKind::Cancelled => (
            StatusCode::CONFLICT,
            PROBLEM_CONFLICT,
            "torrent creation cancelled",
        ),
        ErrorKind::Failed | ErrorKind::Remote => (
            StatusCode::BAD_GATEWAY,
            PROBLEM_REMOTE,
            "remote client error",
        ),
    }
}

impl From<CreationError> for ApiError {
    fn from(error: CreationError) -> Self {
        let (status, kind, title) = problem_for(error.kind());
        let detail = error.detail();
        let api = Self::new(status, kind, title);
        match &error {
            CreationError::Validation { field, reason, .. } => api
                .with_invalid_param(field, *reason)
                .with_optional_detail(detail),
            CreationError::InvalidPieceSize { .. } => api
                .with_invalid_param("piece_size", error.to_string())
                .with_optional_detail(detail),
            _ => api.with_optional_detail(detail),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(error: ListingError) -> Self {
        Self::from(CreationError::from(error))
    }
}

impl From<RemoteError> for ApiError {
    fn from(error: RemoteError) -> Self {
        Self::from(CreationError::from(error))
    }
}

impl From<PieceSizeError> for ApiError {
    fn from(error: PieceSizeError) -> Self {
        Self::from(CreationError::from(error))
    }
}

impl From<JobError> for ApiError {
    fn from(error: JobError) -> Self {
        match error {
            JobError::UnknownJob { job_id } => Self::new(
                StatusCode::NOT_FOUND,
                PROBLEM_NOT_FOUND,
                "creation job not found",
            )
            .with_detail(job_id.to_string()),
            JobError::ArtifactUnavailable { state, .. } => Self::new(
                StatusCode::CONFLICT,
                PROBLEM_CONFLICT,
                "creation job has no artifact",
            )
            .with_detail(format!("job is {state}")),
            JobError::Rejected { source } => Self::from(source),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(error: ConfigError) -> Self {
        Self::config_invalid(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(
                request_id = ?current_request_id(),
                route = ?current_route(),
                status = self.status.as_u16(),
                problem = self.kind,
                detail = ?self.detail,
                "request failed"
            );
        }
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            invalid_params: self.invalid_params,
        };
        (self.status, Json(body)).into_response()
    }
}

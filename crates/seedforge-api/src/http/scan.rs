//! Content scanning and piece size planning endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use seedforge_api_models::{PiecesRequest, PiecesResponse, ScanRequest, ScanResponse};
use seedforge_core::{CreationError, compute_piece_size};
use seedforge_fsops::format_file_size;
use tracing::{debug, info};

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn scan(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let path = request.path.trim();
    if path.is_empty() {
        return Err(CreationError::Validation {
            field: "path",
            reason: "required",
            value: None,
        }
        .into());
    }

    let analysis = state.handles.inspector().scan(path, request.source).await?;
    let target = state.config.snapshot().torrent_creation.target_piece_count;
    let suggested_plan = if analysis.exists {
        compute_piece_size(analysis.total_bytes, target, None).ok()
    } else {
        None
    };
    info!(
        path = %analysis.path,
        total_bytes = analysis.total_bytes,
        files = analysis.file_count,
        truncated = analysis.truncated,
        "scanned content path"
    );
    Ok(Json(ScanResponse {
        total_size: format_file_size(analysis.total_bytes),
        analysis,
        suggested_plan,
    }))
}

pub(crate) async fn pieces(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PiecesRequest>,
) -> Result<Json<PiecesResponse>, ApiError> {
    let target = request
        .target_piece_count
        .unwrap_or_else(|| state.config.snapshot().torrent_creation.target_piece_count);
    let plan = compute_piece_size(request.total_bytes, target, request.piece_size)?;
    debug!(
        total_bytes = request.total_bytes,
        piece_size = plan.piece_size_bytes,
        pieces = plan.piece_count,
        "computed piece plan"
    );
    Ok(Json(PiecesResponse {
        piece_size: format_file_size(plan.piece_size_bytes),
        total_size: format_file_size(request.total_bytes),
        plan,
    }))
}

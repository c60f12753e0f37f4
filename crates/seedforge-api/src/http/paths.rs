//! Path mapping inspection and translation endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use seedforge_api_models::{
    MapDirection, MapRequest, MapResponse, MappingDiagnosticView, MappingsResponse,
};
use seedforge_config::mapping_diagnostics;
use seedforge_core::CreationError;

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn mappings(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<MappingsResponse>, ApiError> {
    let settings = state.config.snapshot();
    let mapper = settings.qbittorrent.path_mapper()?;
    let diagnostics = mapping_diagnostics(&settings)?
        .into_iter()
        .map(|finding| MappingDiagnosticView {
            level: finding.level,
            code: finding.code.to_string(),
            message: finding.message,
        })
        .collect();
    Ok(Json(MappingsResponse {
        mappings: mapper.mappings().to_vec(),
        diagnostics,
    }))
}

pub(crate) async fn map_path(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<MapRequest>,
) -> Result<Json<MapResponse>, ApiError> {
    if request.path.trim().is_empty() {
        return Err(CreationError::Validation {
            field: "path",
            reason: "required",
            value: None,
        }
        .into());
    }
    let mapper = state.config.snapshot().qbittorrent.path_mapper()?;
    let (output, mapped) = match request.direction {
        MapDirection::ToRemote => (
            mapper.to_remote(&request.path),
            mapper.is_mapped(&request.path),
        ),
        MapDirection::ToHost => {
            let output = mapper.to_host(&request.path);
            let mapped = mapper.is_mapped(&output);
            (output, mapped)
        }
    };
    Ok(Json(MapResponse {
        input: request.path,
        output,
        direction: request.direction,
        mapped,
    }))
}

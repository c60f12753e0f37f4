//! Directory browsing endpoints for the host and remote namespaces.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use seedforge_api_models::{BrowseQuery, DirectoryListing, RootsResponse};

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn browse(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<DirectoryListing>, ApiError> {
    let path = query
        .path
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("/");
    let listing = state.handles.inspector().browse(path, query.source).await?;
    Ok(Json(listing))
}

pub(crate) async fn roots(State(state): State<Arc<ApiState>>) -> Json<RootsResponse> {
    Json(RootsResponse {
        roots: state.handles.inspector().roots().await,
    })
}

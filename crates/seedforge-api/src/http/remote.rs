//! Remote client connectivity probe.

use std::sync::Arc;

use axum::{Json, extract::State};
use seedforge_api_models::ConnectionInfo;
use tracing::{info, warn};

use crate::http::errors::ApiError;
use crate::state::{ApiState, REMOTE_COMPONENT};

pub(crate) async fn remote_test(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ConnectionInfo>, ApiError> {
    match state.handles.remote().connection_info().await {
        Ok(info) => {
            state.remove_degraded_component(REMOTE_COMPONENT);
            info!(
                app_version = %info.app_version,
                api_version = %info.api_version,
                creator_supported = info.creator_supported,
                "qBittorrent connection verified"
            );
            if !info.creator_supported {
                warn!(app_version = %info.app_version, "qBittorrent lacks the torrent creator API");
            }
            Ok(Json(info))
        }
        Err(err) => {
            state.add_degraded_component(REMOTE_COMPONENT);
            Err(err.into())
        }
    }
}

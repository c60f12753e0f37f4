//! Torrent creation job endpoints.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use seedforge_api_models::{
    CreateTorrentRequest, CreationAccepted, CreationJobResponse, CreationListResponse,
};
use seedforge_fsops::sanitize_filename;
use tracing::{error, info};
use uuid::Uuid;

use crate::http::constants::CONTENT_TYPE_TORRENT;
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn create_torrent(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CreateTorrentRequest>,
) -> Result<(StatusCode, Json<CreationAccepted>), ApiError> {
    let request = body.into_request(&state.config.snapshot().torrent_creation);
    let source_path = request.source_path.clone();
    let job_id = state.handles.workflow().start(request).await?;
    info!(%job_id, source_path = %source_path, "creation job accepted");
    Ok((StatusCode::ACCEPTED, Json(CreationAccepted::new(job_id))))
}

pub(crate) async fn list_creations(
    State(state): State<Arc<ApiState>>,
) -> Json<CreationListResponse> {
    let jobs = state
        .handles
        .workflow()
        .list()
        .await
        .into_iter()
        .map(CreationJobResponse::from)
        .collect();
    Json(CreationListResponse { jobs })
}

pub(crate) async fn get_creation(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CreationJobResponse>, ApiError> {
    let job = state.handles.workflow().job(id).await?;
    Ok(Json(CreationJobResponse::from(job)))
}

pub(crate) async fn cancel_creation(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CreationJobResponse>, ApiError> {
    let job = state.handles.workflow().cancel(id).await?;
    info!(job_id = %id, state = job.state.as_str(), "creation job cancel requested");
    Ok(Json(CreationJobResponse::from(job)))
}

pub(crate) async fn download_artifact(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let artifact = state.handles.workflow().artifact(id).await?;
    let file_name = sanitize_filename(&artifact.file_name);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONTENT_TYPE_TORRENT)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(Body::from(artifact.bytes))
        .map_err(|err| {
            error!(error = %err, job_id = %id, "failed to build artifact response");
            ApiError::internal("failed to build artifact response")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{StubWorkflow, test_context, test_context_with};
    use seedforge_api_models::{JobState, PieceSizeMode, TorrentFormat};
    use seedforge_config::Settings;
    use seedforge_core::CreationJob;
    use seedforge_test_support::{SAMPLE_TORRENT, ScriptedRemote};

    fn finished_job() -> CreationJob {
        let mut job = CreationJob::new(Uuid::new_v4(), "/mnt/user/data/movie");
        job.state = JobState::Finished;
        job.task_id = Some("task-1".to_string());
        job
    }

    #[tokio::test]
    async fn create_fills_omitted_fields_from_config() -> anyhow::Result<()> {
        let mut settings = Settings::default();
        settings.torrent_creation.private = true;
        settings.torrent_creation.format = TorrentFormat::Hybrid;
        let ctx = test_context_with(settings, StubWorkflow::default(), ScriptedRemote::new())?;

        let (status, Json(accepted)) = create_torrent(
            State(ctx.state.clone()),
            Json(CreateTorrentRequest::for_path("/mnt/user/data/movie")),
        )
        .await
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            accepted.status_url,
            format!("/v1/creations/{}", accepted.job_id)
        );
        let started = ctx
            .workflow
            .started
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .clone();
        assert_eq!(started.len(), 1);
        assert!(started[0].is_private);
        assert_eq!(started[0].format, TorrentFormat::Hybrid);
        assert_eq!(started[0].piece_size_mode, PieceSizeMode::Auto);
        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_invalid_requests() -> anyhow::Result<()> {
        let ctx = test_context()?;
        let body = CreateTorrentRequest {
            piece_size: Some(12_345),
            ..CreateTorrentRequest::for_path("/mnt/user/data/movie")
        };
        let result = create_torrent(State(ctx.state.clone()), Json(body)).await;
        assert!(matches!(result, Err(ref err) if err.status() == StatusCode::BAD_REQUEST));
        Ok(())
    }

    #[tokio::test]
    async fn job_snapshot_includes_result_once_terminal() -> anyhow::Result<()> {
        let job = finished_job();
        let id = job.id;
        let ctx =
            test_context_with(Settings::default(), StubWorkflow::with_job(job), ScriptedRemote::new())?;

        let Json(body) = get_creation(State(ctx.state.clone()), Path(id))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        let result = body.result.ok_or_else(|| anyhow::anyhow!("missing result"))?;
        assert!(result.success);
        assert_eq!(result.task_id.as_deref(), Some("task-1"));

        let Json(list) = list_creations(State(ctx.state.clone())).await;
        assert_eq!(list.jobs.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_jobs_are_not_found() -> anyhow::Result<()> {
        let ctx = test_context()?;
        let result = get_creation(State(ctx.state.clone()), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(ref err) if err.status() == StatusCode::NOT_FOUND));
        let result = cancel_creation(State(ctx.state.clone()), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(ref err) if err.status() == StatusCode::NOT_FOUND));
        Ok(())
    }

    #[tokio::test]
    async fn cancel_returns_the_updated_snapshot() -> anyhow::Result<()> {
        let job = CreationJob::new(Uuid::new_v4(), "/mnt/user/data/movie");
        let id = job.id;
        let ctx =
            test_context_with(Settings::default(), StubWorkflow::with_job(job), ScriptedRemote::new())?;
        let Json(body) = cancel_creation(State(ctx.state.clone()), Path(id))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(body.job.state, JobState::Cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn artifact_download_sets_torrent_headers() -> anyhow::Result<()> {
        let job = finished_job();
        let id = job.id;
        let ctx =
            test_context_with(Settings::default(), StubWorkflow::with_job(job), ScriptedRemote::new())?;
        let response = download_artifact(State(ctx.state.clone()), Path(id))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(CONTENT_TYPE_TORRENT)
        );
        assert_eq!(
            headers
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"movie.torrent\"")
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(body.as_ref(), SAMPLE_TORRENT);
        Ok(())
    }

    #[tokio::test]
    async fn artifact_of_running_job_conflicts() -> anyhow::Result<()> {
        let job = CreationJob::new(Uuid::new_v4(), "/mnt/user/data/movie");
        let id = job.id;
        let ctx =
            test_context_with(Settings::default(), StubWorkflow::with_job(job), ScriptedRemote::new())?;
        let result = download_artifact(State(ctx.state.clone()), Path(id)).await;
        assert!(matches!(result, Err(ref err) if err.status() == StatusCode::CONFLICT));
        Ok(())
    }
}

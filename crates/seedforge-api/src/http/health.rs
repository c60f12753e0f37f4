//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use seedforge_core::JobState;
use seedforge_telemetry::build_sha;
use serde::Serialize;
use tracing::{error, warn};

use crate::http::errors::ApiError;
use crate::state::{ApiState, REMOTE_COMPONENT};

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: &'static str,
    pub(crate) degraded: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct FullHealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: &'static str,
    pub(crate) degraded: Vec<String>,
    pub(crate) remote: RemoteHealth,
    pub(crate) metrics: HealthMetricsResponse,
    pub(crate) jobs: JobCounts,
}

#[derive(Serialize)]
pub(crate) struct RemoteHealth {
    pub(crate) reachable: bool,
    pub(crate) app_version: Option<String>,
    pub(crate) api_version: Option<String>,
    pub(crate) creator_supported: bool,
}

#[derive(Serialize)]
pub(crate) struct HealthMetricsResponse {
    pub(crate) active_creations: i64,
    pub(crate) creation_fallback_total: u64,
    pub(crate) remote_poll_total: u64,
    pub(crate) cleanup_failures_total: u64,
    pub(crate) config_reload_failures_total: u64,
}

#[derive(Serialize, Default)]
pub(crate) struct JobCounts {
    pub(crate) running: usize,
    pub(crate) finished: usize,
    pub(crate) failed: usize,
    pub(crate) cancelled: usize,
}

const fn status_label(degraded: &[String]) -> &'static str {
    if degraded.is_empty() { "ok" } else { "degraded" }
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let degraded = state.current_health_degraded();
    Json(HealthResponse {
        status: status_label(&degraded),
        build: build_sha(),
        degraded,
    })
}

pub(crate) async fn health_full(State(state): State<Arc<ApiState>>) -> Json<FullHealthResponse> {
    let remote = match state.handles.remote().connection_info().await {
        Ok(info) => {
            state.remove_degraded_component(REMOTE_COMPONENT);
            RemoteHealth {
                reachable: true,
                app_version: Some(info.app_version),
                api_version: Some(info.api_version),
                creator_supported: info.creator_supported,
            }
        }
        Err(err) => {
            state.add_degraded_component(REMOTE_COMPONENT);
            warn!(error = %err, "full health check failed to reach qBittorrent");
            RemoteHealth {
                reachable: false,
                app_version: None,
                api_version: None,
                creator_supported: false,
            }
        }
    };

    let mut jobs = JobCounts::default();
    for job in state.handles.workflow().list().await {
        match job.state {
            JobState::Finished => jobs.finished += 1,
            JobState::Failed => jobs.failed += 1,
            JobState::Cancelled => jobs.cancelled += 1,
            _ => jobs.running += 1,
        }
    }

    let snapshot = state.telemetry.snapshot();
    let degraded = state.current_health_degraded();
    Json(FullHealthResponse {
        status: status_label(&degraded),
        build: build_sha(),
        degraded,
        remote,
        metrics: HealthMetricsResponse {
            active_creations: snapshot.active_creations,
            creation_fallback_total: snapshot.creation_fallback_total,
            remote_poll_total: snapshot.remote_poll_total,
            cleanup_failures_total: snapshot.cleanup_failures_total,
            config_reload_failures_total: snapshot.config_reload_failures_total,
        },
        jobs,
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{StubWorkflow, test_context, test_context_with};
    use seedforge_config::Settings;
    use seedforge_core::CreationJob;
    use seedforge_test_support::{ScriptedFailure, ScriptedRemote};
    use uuid::Uuid;

    #[tokio::test]
    async fn health_reports_ok_when_nothing_is_degraded() -> anyhow::Result<()> {
        let ctx = test_context()?;
        let Json(body) = health(State(ctx.state.clone())).await;
        assert_eq!(body.status, "ok");
        assert!(body.degraded.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn full_health_marks_unreachable_remote_as_degraded() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().with_connection(Err(ScriptedFailure::Connection));
        let ctx = test_context_with(Settings::default(), StubWorkflow::default(), remote)?;

        let Json(body) = health_full(State(ctx.state.clone())).await;
        assert_eq!(body.status, "degraded");
        assert!(!body.remote.reachable);
        assert_eq!(body.degraded, vec![REMOTE_COMPONENT]);

        let Json(summary) = health(State(ctx.state.clone())).await;
        assert_eq!(summary.status, "degraded");
        Ok(())
    }

    #[tokio::test]
    async fn full_health_counts_jobs_by_state() -> anyhow::Result<()> {
        let mut finished = CreationJob::new(Uuid::new_v4(), "/mnt/user/data/movie");
        finished.state = JobState::Finished;
        let workflow = StubWorkflow::with_job(finished);
        let ctx = test_context_with(Settings::default(), workflow, ScriptedRemote::new())?;

        let Json(body) = health_full(State(ctx.state.clone())).await;
        assert_eq!(body.status, "ok");
        assert!(body.remote.reachable);
        assert!(body.remote.creator_supported);
        assert_eq!(body.jobs.finished, 1);
        assert_eq!(body.jobs.running, 0);
        Ok(())
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() -> anyhow::Result<()> {
        let ctx = test_context()?;
        ctx.state.telemetry.inc_http_request("/health", 200);
        let response = metrics(State(ctx.state.clone()))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        assert_eq!(content_type, Some("text/plain; version=0.0.4"));
        Ok(())
    }
}

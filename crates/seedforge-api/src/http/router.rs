//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use seedforge_config::ConfigService;
use seedforge_events::EventBus;
use seedforge_telemetry::{Metrics, REQUEST_ID_HEADER, build_sha};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info, warn};

use crate::CreationHandles;
use crate::error::{ApiServerError, ApiServerResult};
use crate::http::browse::{browse, roots};
use crate::http::constants::HEADER_LAST_EVENT_ID;
use crate::http::creations::{
    cancel_creation, create_torrent, download_artifact, get_creation, list_creations,
};
use crate::http::health::{health, health_full, metrics};
use crate::http::paths::{map_path, mappings};
use crate::http::remote::remote_test;
use crate::http::scan::{pieces, scan};
use crate::http::sse::{creation_events, stream_events};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the seedforge API services.
pub struct ApiServer {
    router: Router,
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Construct the API server with shared dependencies wired through application state.
    #[must_use]
    pub fn new(
        config: ConfigService,
        events: EventBus,
        handles: CreationHandles,
        telemetry: Metrics,
    ) -> Self {
        let state = Arc::new(ApiState::new(config, telemetry.clone(), events, handles));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_LAST_EVENT_ID)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(seedforge_telemetry::propagate_request_id_layer())
            .layer(seedforge_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::public_routes()
            .merge(Self::v1_routes())
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(Arc::clone(&state));

        Self { router, state }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/health/full", get(health_full))
            .route("/metrics", get(metrics))
    }

    fn v1_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/v1/scan", post(scan))
            .route("/v1/pieces", post(pieces))
            .route("/v1/browse", get(browse))
            .route("/v1/browse/roots", get(roots))
            .route("/v1/paths/mappings", get(mappings))
            .route("/v1/paths/map", post(map_path))
            .route("/v1/creations", get(list_creations).post(create_torrent))
            .route(
                "/v1/creations/{id}",
                get(get_creation).delete(cancel_creation),
            )
            .route("/v1/creations/{id}/artifact", get(download_artifact))
            .route("/v1/creations/{id}/events", get(creation_events))
            .route("/v1/events", get(stream_events))
            .route("/v1/remote/test", get(remote_test).post(remote_test))
    }

    /// Mirror health reports from the event bus into the server's degraded set.
    fn spawn_health_tracker(state: Arc<ApiState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut events = state.events.subscribe(Some(0));
            while let Some(envelope) = events.next().await {
                state.apply_health_event(&envelope.event);
            }
        })
    }

    /// Serve the API on `addr` until Ctrl-C is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "API listening");
        let tracker = Self::spawn_health_tracker(Arc::clone(&self.state));
        let result = axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|source| ApiServerError::Serve { source });
        tracker.abort();
        result
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{StubWorkflow, test_context_with};
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use seedforge_api_models::{CreationAccepted, ProblemDetails};
    use seedforge_config::Settings;
    use seedforge_core::{CreationWorkflow, PathInspector, RemoteTorrentClient};
    use seedforge_events::Event;
    use seedforge_test_support::ScriptedRemote;
    use tower::ServiceExt;

    fn server() -> anyhow::Result<(ApiServer, Arc<StubWorkflow>)> {
        let ctx = test_context_with(
            Settings::default(),
            StubWorkflow::default(),
            ScriptedRemote::new(),
        )?;
        let workflow: Arc<dyn CreationWorkflow> = ctx.workflow.clone();
        let inspector: Arc<dyn PathInspector> = Arc::clone(ctx.state.handles.inspector());
        let remote: Arc<dyn RemoteTorrentClient> = ctx.remote.clone();
        let server = ApiServer::new(
            ConfigService::from_settings(Settings::default()),
            EventBus::with_capacity(16),
            CreationHandles::new(workflow, inspector, remote),
            Metrics::new()?,
        );
        Ok((server, ctx.workflow))
    }

    #[tokio::test]
    async fn health_route_echoes_request_id() -> anyhow::Result<()> {
        let (server, _) = server()?;
        let response = server
            .router()
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, "req-1")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok()),
            Some("req-1")
        );
        Ok(())
    }

    #[tokio::test]
    async fn create_route_accepts_json_and_counts_requests() -> anyhow::Result<()> {
        let (server, workflow) = server()?;
        let response = server
            .router()
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/creations")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"path":"/mnt/user/data/movie"}"#))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let accepted: CreationAccepted = serde_json::from_slice(&body)?;
        assert_eq!(workflow.list().await.len(), 1);
        assert_eq!(workflow.list().await[0].id, accepted.job_id);

        let rendered = server.state.telemetry.render()?;
        assert!(rendered.contains("/v1/creations"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_job_returns_problem_document() -> anyhow::Result<()> {
        let (server, _) = server()?;
        let response = server
            .router()
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/creations/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let problem: ProblemDetails = serde_json::from_slice(&body)?;
        assert_eq!(problem.status, 404);
        Ok(())
    }

    #[tokio::test]
    async fn health_tracker_mirrors_watcher_events() -> anyhow::Result<()> {
        let (server, _) = server()?;
        server.state.events.publish(Event::HealthChanged {
            degraded: vec!["config_watcher".to_string()],
        });
        let tracker = ApiServer::spawn_health_tracker(Arc::clone(&server.state));
        let mut degraded = Vec::new();
        for _ in 0..50 {
            degraded = server.state.current_health_degraded();
            if !degraded.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tracker.abort();
        assert_eq!(degraded, vec!["config_watcher"]);
        Ok(())
    }
}

//! Per-route request counting and request-scoped log context.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::MatchedPath;
use axum::http::Request;
use seedforge_telemetry::{Metrics, REQUEST_ID_HEADER, with_request_context};
use tower::{Layer, Service};

/// Label used when a request reached the layer without a matched route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Routes whose traffic is not counted in `http_requests_total`.
const UNCOUNTED_ROUTES: &[&str] = &["/metrics"];

/// Counts requests by route template and status. Concrete paths never become labels,
/// so `/v1/creations/{id}` stays one series however many jobs exist.
#[derive(Clone)]
pub(crate) struct HttpMetricsLayer {
    metrics: Metrics,
}

impl HttpMetricsLayer {
    pub(crate) const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = CountedRoute<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CountedRoute {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct CountedRoute<S> {
    inner: S,
    metrics: Metrics,
}

fn route_label<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |m| m.as_str().to_string())
}

impl<S, B> Service<Request<B>> for CountedRoute<S>
where
    S: Service<Request<B>, Response = axum::response::Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let route = route_label(&req);
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let metrics = (!UNCOUNTED_ROUTES.contains(&route.as_str())).then(|| self.metrics.clone());
        let fut = self.inner.call(req);

        Box::pin(with_request_context(request_id, route.clone(), async move {
            let response = fut.await?;
            // SSE responses are counted when the stream opens, not when it ends
            if let Some(metrics) = metrics {
                metrics.inc_http_request(&route, response.status().as_u16());
            }
            Ok(response)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;

    fn router(metrics: &Metrics) -> Router {
        Router::new()
            .route("/v1/creations/{id}", get(|| async { StatusCode::NOT_FOUND }))
            .route("/metrics", get(|| async { "scrape" }))
            .route_layer(HttpMetricsLayer::new(metrics.clone()))
    }

    async fn send(router: &Router, uri: &str) -> anyhow::Result<StatusCode> {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        Ok(response.status())
    }

    #[tokio::test]
    async fn job_ids_collapse_into_the_route_template() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let router = router(&metrics);

        send(&router, "/v1/creations/4a1b").await?;
        send(&router, "/v1/creations/9c2d").await?;

        let rendered = metrics.render()?;
        assert!(!rendered.contains("4a1b"));
        assert!(rendered.lines().any(|line| {
            line.starts_with("http_requests_total{")
                && line.contains("route=\"/v1/creations/{id}\"")
                && line.ends_with(" 2")
        }));
        Ok(())
    }

    #[tokio::test]
    async fn metrics_scrapes_are_not_counted() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let router = router(&metrics);

        assert_eq!(send(&router, "/metrics").await?, StatusCode::OK);

        assert!(!metrics.render()?.contains("route=\"/metrics\""));
        Ok(())
    }
}

//! Task-local request context so handlers can tag errors with the request id.

use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

tokio::task_local! {
    static ACTIVE_REQUEST_CONTEXT: RequestContext;
}

/// Request identifier of the request being served, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.request_id.as_ref().to_string())
        .ok()
        .filter(|id| !id.is_empty())
}

/// Matched route of the request being served, if any.
#[must_use]
pub fn current_route() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.route.as_ref().to_string())
        .ok()
}

/// Run `fut` with the request context available to [`current_request_id`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    ACTIVE_REQUEST_CONTEXT.scope(context, fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_is_scoped_to_the_future() {
        let output = with_request_context("req-42", "/v1/scan", async {
            assert_eq!(current_request_id().as_deref(), Some("req-42"));
            assert_eq!(current_route().as_deref(), Some("/v1/scan"));
            "done"
        })
        .await;
        assert_eq!(output, "done");
        assert!(current_request_id().is_none());
        assert!(current_route().is_none());
    }

    #[tokio::test]
    async fn empty_request_id_reads_as_none() {
        with_request_context("", "/health", async {
            assert!(current_request_id().is_none());
        })
        .await;
    }
}

//! Server-sent events filters and streaming helpers.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::sse::{self, Sse},
};
use futures_util::{StreamExt, future};
use seedforge_api_models::CreationJobResponse;
use seedforge_core::CreationJob;
use seedforge_events::{EventBus, EventEnvelope, EventId};
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::http::constants::{EVENT_KIND_WHITELIST, HEADER_LAST_EVENT_ID, SSE_KEEP_ALIVE_SECS};
use crate::http::errors::ApiError;
use crate::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SseQuery {
    #[serde(default)]
    pub(crate) job: Option<String>,
    #[serde(default)]
    pub(crate) event: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SseFilter {
    pub(crate) job_ids: HashSet<Uuid>,
    pub(crate) event_kinds: HashSet<String>,
}

fn keep_alive() -> sse::KeepAlive {
    sse::KeepAlive::new()
        .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
        .text("keep-alive")
}

fn last_event_id(headers: &HeaderMap) -> Option<EventId> {
    headers
        .get(HEADER_LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<EventId>().ok())
}

pub(crate) async fn stream_events(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send>, ApiError>
{
    let filter = build_sse_filter(&query)?;
    let since = last_event_id(&headers);
    debug!(?since, "event stream opened");
    let stream = event_sse_stream(state.events.clone(), since, filter);
    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

/// Progress stream of a single job, replayed from the start of the buffer and closed
/// after the job's final event.
pub(crate) async fn creation_events(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Sse<impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send>, ApiError>
{
    let job = state.handles.workflow().job(id).await?;
    let since = last_event_id(&headers).or(Some(0));
    let stream = job_sse_stream(state.events.clone(), since, job);
    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

fn split_comma_separated(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
}

pub(crate) fn build_sse_filter(query: &SseQuery) -> Result<SseFilter, ApiError> {
    let mut filter = SseFilter::default();

    if let Some(jobs) = query.job.as_deref() {
        for value in split_comma_separated(jobs) {
            let parsed = Uuid::parse_str(&value).map_err(|_| {
                ApiError::bad_request(format!("job filter '{value}' is not a valid UUID"))
            })?;
            filter.job_ids.insert(parsed);
        }
    }

    if let Some(events) = query.event.as_deref() {
        for value in split_comma_separated(events) {
            if !EVENT_KIND_WHITELIST.contains(&value.as_str()) {
                return Err(ApiError::bad_request(format!(
                    "event filter '{value}' is not recognised"
                )));
            }
            filter.event_kinds.insert(value);
        }
    }

    Ok(filter)
}

pub(crate) fn matches_sse_filter(envelope: &EventEnvelope, filter: &SseFilter) -> bool {
    if !filter.event_kinds.is_empty() && !filter.event_kinds.contains(envelope.event.kind()) {
        return false;
    }
    if !filter.job_ids.is_empty() {
        return envelope
            .event
            .job_id()
            .is_some_and(|job_id| filter.job_ids.contains(&job_id));
    }
    true
}

fn to_sse_event(envelope: &EventEnvelope) -> Option<sse::Event> {
    match serde_json::to_string(envelope) {
        Ok(payload) => Some(
            sse::Event::default()
                .id(envelope.id.to_string())
                .event(envelope.event.kind())
                .data(payload),
        ),
        Err(err) => {
            error!(error = %err, "failed to serialise SSE event payload");
            None
        }
    }
}

pub(crate) fn event_replay_stream(
    bus: EventBus,
    since: Option<EventId>,
) -> impl futures_core::Stream<Item = EventEnvelope> + Send {
    stream! {
        let mut stream = bus.subscribe(since);
        while let Some(envelope) = stream.next().await {
            yield envelope;
        }
    }
}

pub(crate) fn event_sse_stream(
    bus: EventBus,
    since: Option<EventId>,
    filter: SseFilter,
) -> impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send {
    let filter = Arc::new(filter);
    event_replay_stream(bus, since)
        .filter(move |envelope| future::ready(matches_sse_filter(envelope, &filter)))
        .scan(None, move |last_id: &mut Option<EventId>, envelope| {
            if last_id.is_some_and(|prev| prev == envelope.id) {
                future::ready(Some(None))
            } else {
                *last_id = Some(envelope.id);
                future::ready(Some(Some(envelope)))
            }
        })
        .filter_map(|maybe| async move { maybe })
        .filter_map(|envelope| async move { to_sse_event(&envelope).map(Ok) })
}

/// Events of `job`; a job that already ended and whose events left the replay buffer
/// gets a single `snapshot` event instead.
pub(crate) fn job_sse_stream(
    bus: EventBus,
    since: Option<EventId>,
    job: CreationJob,
) -> impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send {
    stream! {
        let job_id = job.id;
        let replayed_end = since.is_some_and(|id| {
            bus.backlog_since(id)
                .iter()
                .any(|envelope| envelope.event.job_id() == Some(job_id) && envelope.event.is_terminal())
        });
        if job.state.is_terminal() && !replayed_end {
            let snapshot = CreationJobResponse::from(job);
            match serde_json::to_string(&snapshot) {
                Ok(payload) => yield Ok(sse::Event::default().event("snapshot").data(payload)),
                Err(err) => error!(error = %err, "failed to serialise job snapshot"),
            }
            return;
        }

        let mut events = bus.subscribe(since);
        while let Some(envelope) = events.next().await {
            if envelope.event.job_id() != Some(job_id) {
                continue;
            }
            if let Some(event) = to_sse_event(&envelope) {
                yield Ok(event);
            }
            if envelope.event.is_terminal() {
                debug!(%job_id, "job stream finished");
                break;
            }
        }
    }
}

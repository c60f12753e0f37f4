use std::fs;
use std::time::Duration;

use anyhow::anyhow;
use futures_util::StreamExt;
use seedforge_events::{EventEnvelope, EventId};
use uuid::Uuid;

use crate::cli::TailArgs;
use crate::client::{AppContext, CliError, CliResult, HEADER_LAST_EVENT_ID, classify_problem};

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub(crate) id: Option<EventId>,
    pub(crate) event: Option<String>,
    pub(crate) data: String,
}

/// Incremental decoder turning response chunks into [`SseFrame`]s.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    id: Option<EventId>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        // multi-byte characters may straddle chunks; only complete lines are decoded
        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]);
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                if self.data.is_empty() {
                    self.id = None;
                    self.event = None;
                    continue;
                }
                frames.push(SseFrame {
                    id: self.id.take(),
                    event: self.event.take(),
                    data: self.data.join("\n"),
                });
                self.data.clear();
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data.push(data.trim_start().to_string());
            } else if let Some(id) = line.strip_prefix("id:")
                && let Ok(value) = id.trim_start().parse::<EventId>()
            {
                self.id = Some(value);
            } else if let Some(event) = line.strip_prefix("event:") {
                self.event = Some(event.trim_start().to_string());
            }
            // comments (":") and retry hints carry nothing we need
        }
        frames
    }
}

pub(crate) async fn handle_tail(ctx: &AppContext, args: TailArgs) -> CliResult<()> {
    let mut resume_id = args
        .resume_file
        .as_ref()
        .and_then(|path| fs::read_to_string(path).ok())
        .and_then(|value| value.trim().parse::<EventId>().ok());

    loop {
        let mut url = ctx.endpoint("/v1/events")?;
        {
            let mut pairs = url.query_pairs_mut();
            if !args.job.is_empty() {
                let value = args
                    .job
                    .iter()
                    .map(Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                pairs.append_pair("job", &value);
            }
            if !args.event.is_empty() {
                pairs.append_pair("event", &args.event.join(","));
            }
        }

        let builder = ctx.client.get(url);
        let builder = if let Some(id) = resume_id {
            builder.header(HEADER_LAST_EVENT_ID, id.to_string())
        } else {
            builder
        };

        let response = match builder.send().await {
            Ok(resp) => resp,
            Err(err) => {
                eprintln!(
                    "stream connection failed: {err}. retrying in {}s",
                    args.retry_secs
                );
                tokio::time::sleep(Duration::from_secs(args.retry_secs)).await;
                continue;
            }
        };

        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }

        match stream_events(response, &args, resume_id).await {
            Ok(last_id) => resume_id = last_id,
            Err(err) => {
                eprintln!(
                    "stream error: {}. retrying in {}s",
                    err.display_message(),
                    args.retry_secs
                );
                tokio::time::sleep(Duration::from_secs(args.retry_secs)).await;
            }
        }
    }
}

/// Print envelopes from `response` until it ends; returns the last event id seen.
pub(crate) async fn stream_events(
    response: reqwest::Response,
    args: &TailArgs,
    resume_id: Option<EventId>,
) -> CliResult<Option<EventId>> {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    let mut last_seen = resume_id;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|err| CliError::failure(anyhow!("failed to read event stream: {err}")))?;
        for frame in decoder.push(&chunk) {
            if let Some(id) = frame.id {
                if last_seen.is_some_and(|seen| id <= seen) {
                    continue;
                }
                last_seen = Some(id);
                if let Some(path) = &args.resume_file
                    && let Err(err) = fs::write(path, id.to_string())
                {
                    eprintln!("failed to persist resume id to {}: {err}", path.display());
                }
            }
            match serde_json::from_str::<EventEnvelope>(&frame.data) {
                Ok(envelope) => {
                    let text = serde_json::to_string(&envelope).map_err(|err| {
                        CliError::failure(anyhow!("failed to format event JSON: {err}"))
                    })?;
                    println!("{text}");
                }
                Err(err) => {
                    eprintln!("discarding malformed event payload: {err} -- {}", frame.data);
                }
            }
        }
    }

    Ok(last_seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use reqwest::Client;

    fn envelope_line(id: EventId) -> String {
        format!(
            "id: {id}\nevent: settings_changed\ndata: {{\"id\":{id},\"timestamp\":\"2026-01-01T00:00:00Z\",\"event\":{{\"type\":\"settings_changed\",\"description\":\"reload\"}}}}\n\n"
        )
    }

    #[test]
    fn decoder_handles_split_chunks_and_multiline_data() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"id: 7\nevent: prog").is_empty());
        let frames = decoder.push(b"ress\ndata: first\r\ndata: second\n\n: keep-alive\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                id: Some(7),
                event: Some("progress".to_string()),
                data: "first\nsecond".to_string(),
            }]
        );
    }

    #[test]
    fn decoder_keeps_characters_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let payload = "data: {\"description\":\"caf\u{e9}\"}\n\n".as_bytes();
        let split = payload
            .iter()
            .position(|byte| *byte == 0xC3)
            .map_or(payload.len(), |pos| pos + 1);

        assert!(decoder.push(&payload[..split]).is_empty());
        let frames = decoder.push(&payload[split..]);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"description\":\"caf\u{e9}\"}");
        assert!(!frames[0].data.contains('\u{fffd}'));
    }

    #[test]
    fn decoder_emits_frames_without_ids() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b"event: snapshot\ndata: {}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, None);
        assert_eq!(frames[0].event.as_deref(), Some("snapshot"));
    }

    #[tokio::test]
    async fn stream_skips_replayed_ids_and_persists_resume_point() -> Result<()> {
        let server = MockServer::start_async().await;
        let body = format!("{}{}{}", envelope_line(3), envelope_line(4), envelope_line(5));
        server.mock(|when, then| {
            when.method(GET).path("/v1/events");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(body);
        });
        let dir = tempfile::tempdir()?;
        let resume = dir.path().join("last-event");
        let args = TailArgs {
            resume_file: Some(resume.clone()),
            ..TailArgs::default()
        };

        let response = Client::new()
            .get(format!("{}/v1/events", server.base_url()))
            .send()
            .await?;
        let last = stream_events(response, &args, Some(3))
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(last, Some(5));
        assert_eq!(fs::read_to_string(&resume)?, "5");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_filter_is_a_validation_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/v1/events")
                .query_param("event", "bogus");
            then.status(400).json_body(serde_json::json!({
                "type": "https://seedforge.dev/problems/bad-request",
                "title": "bad request",
                "status": 400,
                "detail": "unknown event kind 'bogus'"
            }));
        });
        let ctx = AppContext {
            client: Client::new(),
            base_url: server.base_url().parse()?,
        };
        let err = handle_tail(
            &ctx,
            TailArgs {
                event: vec!["bogus".to_string()],
                ..TailArgs::default()
            },
        )
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }
}

//! Creation job commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use seedforge_api_models::{
    CreateTorrentRequest, CreationAccepted, CreationJobResponse, CreationListResponse, JobState,
    PieceSizeMode, artifact_path, creation_path,
};
use seedforge_events::{Event, EventEnvelope};
use uuid::Uuid;

use crate::cli::{CreateArgs, DownloadArgs, JobArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, classify_problem};
use crate::commands::tail::SseDecoder;
use crate::output::{accepted_table, format_bytes, job_list_table, job_table, render};

pub(crate) async fn handle_create(
    ctx: &AppContext,
    args: CreateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let request = build_create_request(&args)?;
    let accepted: CreationAccepted = ctx.post_json("/v1/creations", &request).await?;

    if !args.follow && args.output.is_none() {
        return render(&accepted, format, accepted_table);
    }

    eprintln!("job {} accepted", accepted.job_id);
    follow_job(ctx, &accepted).await?;
    let finished: CreationJobResponse = ctx.get_json(&accepted.status_url).await?;
    render(&finished, format, job_table)?;

    match finished.job.state {
        JobState::Finished => {
            if let Some(output) = args.output.as_deref() {
                let saved = download_artifact(ctx, accepted.job_id, Some(output)).await?;
                eprintln!("saved {}", saved.display());
            }
            Ok(())
        }
        state => Err(CliError::failure(anyhow!(
            "creation ended in state {}",
            state.as_str()
        ))),
    }
}

/// Assemble the request body; omitted flags are left to the server defaults.
pub(crate) fn build_create_request(args: &CreateArgs) -> CliResult<CreateTorrentRequest> {
    if args.path.trim().is_empty() {
        return Err(CliError::validation("path must not be empty"));
    }
    if args.auto_piece_size && args.piece_size.is_some() {
        return Err(CliError::validation(
            "--piece-size and --auto-piece-size are mutually exclusive",
        ));
    }

    let tiers: Vec<Vec<String>> = args
        .trackers
        .iter()
        .map(|tier| {
            tier.split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|tier| !tier.is_empty())
        .collect();
    let web_seeds: Vec<String> = args
        .web_seeds
        .iter()
        .map(|seed| seed.trim().to_string())
        .filter(|seed| !seed.is_empty())
        .collect();

    Ok(CreateTorrentRequest {
        path: args.path.clone(),
        path_source: args.source.map(Into::into),
        piece_size_mode: args.auto_piece_size.then_some(PieceSizeMode::Auto),
        piece_size: args.piece_size,
        target_piece_count: args.target_pieces,
        private: args.private,
        start_seeding: args.seed,
        ignore_share_ratio: args.ignore_share_ratio,
        optimize_alignment: args.optimize_alignment,
        padded_file_size_limit: args.padded_file_size_limit,
        trackers: (!tiers.is_empty()).then_some(tiers),
        url_seeds: (!web_seeds.is_empty()).then_some(web_seeds),
        comment: args.comment.clone(),
        source: args.source_tag.clone(),
        format: args.torrent_format.map(Into::into),
    })
}

/// Print progress from the job's event stream until it reports an outcome.
async fn follow_job(ctx: &AppContext, accepted: &CreationAccepted) -> CliResult<()> {
    let url = ctx.endpoint(&accepted.events_url)?;
    let response = ctx
        .client
        .get(url)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to open progress stream: {err}")))?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|err| CliError::failure(anyhow!("failed to read progress stream: {err}")))?;
        for frame in decoder.push(&chunk) {
            if frame.event.as_deref() == Some("snapshot") {
                return Ok(());
            }
            let Ok(envelope) = serde_json::from_str::<EventEnvelope>(&frame.data) else {
                continue;
            };
            match envelope.event {
                Event::CreationSubmitted {
                    task_id, fallback, ..
                } => {
                    if fallback {
                        eprintln!("submitted as {task_id} with reduced parameters");
                    } else {
                        eprintln!("submitted as {task_id}");
                    }
                }
                Event::CreationProgress {
                    phase,
                    percent,
                    eta_seconds,
                    ..
                } => match eta_seconds {
                    Some(eta) => eprintln!("{phase:?} {percent:.1}% (eta {eta}s)"),
                    None => eprintln!("{phase:?} {percent:.1}%"),
                },
                Event::CreationCompleted { .. } | Event::CreationFailed { .. } => return Ok(()),
                _ => {}
            }
        }
    }
    Ok(())
}

pub(crate) async fn handle_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let list: CreationListResponse = ctx.get_json("/v1/creations").await?;
    render(&list, format, job_list_table)
}

pub(crate) async fn handle_status(
    ctx: &AppContext,
    args: JobArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let job: CreationJobResponse = ctx.get_json(&creation_path(args.id)).await?;
    render(&job, format, job_table)
}

pub(crate) async fn handle_cancel(
    ctx: &AppContext,
    args: JobArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let job: CreationJobResponse = ctx.delete_json(&creation_path(args.id)).await?;
    render(&job, format, job_table)
}

pub(crate) async fn handle_download(ctx: &AppContext, args: DownloadArgs) -> CliResult<()> {
    let saved = download_artifact(ctx, args.id, args.output.as_deref()).await?;
    println!("{}", saved.display());
    Ok(())
}

/// Fetch the artifact of `job_id` and write it to `output`.
///
/// A directory (or no output at all) receives the file under the name the server suggests.
async fn download_artifact(
    ctx: &AppContext,
    job_id: Uuid,
    output: Option<&Path>,
) -> CliResult<PathBuf> {
    let path = artifact_path(job_id);
    let response = ctx
        .client
        .get(ctx.endpoint(&path)?)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to {path} failed: {err}")))?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let suggested = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(attachment_filename)
        .unwrap_or_else(|| format!("{job_id}.torrent"));
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to read artifact: {err}")))?;

    let target = match output {
        Some(dir) if dir.is_dir() => dir.join(&suggested),
        Some(file) => file.to_path_buf(),
        None => PathBuf::from(&suggested),
    };
    fs::write(&target, &bytes).map_err(|err| {
        CliError::failure(anyhow!("failed to write {}: {err}", target.display()))
    })?;
    eprintln!(
        "wrote {} to {}",
        format_bytes(u64::try_from(bytes.len()).unwrap_or(u64::MAX)),
        target.display()
    );
    Ok(target)
}

/// File name from an `attachment; filename="..."` header, stripped of any directories.
fn attachment_filename(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?;
    let name = raw.trim_matches('"');
    let name = Path::new(name).file_name()?.to_str()?;
    (!name.is_empty()).then(|| name.to_string())
}

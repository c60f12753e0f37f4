//! Background creation jobs tracked in memory.
//!
//! # Design
//! - Every job runs the orchestrator on its own task; snapshots are updated from the
//!   observer callbacks and published on the event bus.
//! - Finished jobs keep their artifact until evicted; only the most recent
//!   [`MAX_RETAINED_JOBS`] terminal jobs are retained.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use seedforge_config::ConfigService;
use seedforge_core::{
    CreationError, CreationJob, CreationObserver, CreationOutcome, CreationRequest,
    CreationResult, CreationWorkflow, ErrorKind, JobError, JobFailure, JobResult, JobState,
    ListingError, ListingSource, PathInspector, PieceSizeMode, ProgressUpdate,
    RemoteTorrentClient, TaskPhase, TorrentArtifact, validate_request,
};
use seedforge_events::{Event, EventBus};
use seedforge_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::orchestrator::{CreationContext, CreationOrchestrator};

/// Terminal jobs kept for status and artifact queries.
pub const MAX_RETAINED_JOBS: usize = 256;

struct JobEntry {
    snapshot: CreationJob,
    cancel: CancellationToken,
    artifact: Option<TorrentArtifact>,
}

type JobTable = Arc<Mutex<HashMap<Uuid, JobEntry>>>;

fn lock_jobs(jobs: &JobTable) -> MutexGuard<'_, HashMap<Uuid, JobEntry>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

fn update_job(jobs: &JobTable, id: Uuid, apply: impl FnOnce(&mut JobEntry)) {
    if let Some(entry) = lock_jobs(jobs).get_mut(&id) {
        apply(entry);
        entry.snapshot.updated_at = Utc::now();
    }
}

pub(crate) fn publish(events: &EventBus, metrics: &Metrics, event: Event) {
    let kind = event.kind();
    metrics.inc_event(kind);
    let event_id = events.publish(event);
    debug!(event_id, event_kind = kind, "event published");
}

/// [`CreationWorkflow`] running orchestrations in the background.
pub struct JobRegistry<C: ?Sized> {
    orchestrator: Arc<CreationOrchestrator<C>>,
    inspector: Arc<dyn PathInspector>,
    config: ConfigService,
    events: EventBus,
    metrics: Metrics,
    jobs: JobTable,
    tracker: TaskTracker,
}

impl<C> JobRegistry<C>
where
    C: RemoteTorrentClient + ?Sized + 'static,
{
    /// Registry spawning jobs on the current runtime.
    #[must_use]
    pub fn new(
        orchestrator: Arc<CreationOrchestrator<C>>,
        inspector: Arc<dyn PathInspector>,
        config: ConfigService,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            orchestrator,
            inspector,
            config,
            events,
            metrics,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// Cancel every running job and wait for them to settle.
    pub async fn shutdown(&self) {
        for entry in lock_jobs(&self.jobs).values() {
            entry.cancel.cancel();
        }
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn prune(&self) {
        let mut jobs = lock_jobs(&self.jobs);
        let mut terminal: Vec<_> = jobs
            .values()
            .filter(|entry| entry.snapshot.state.is_terminal())
            .map(|entry| (entry.snapshot.updated_at, entry.snapshot.id))
            .collect();
        if terminal.len() <= MAX_RETAINED_JOBS {
            return;
        }
        terminal.sort_unstable();
        let excess = terminal.len() - MAX_RETAINED_JOBS;
        for (_, id) in terminal.into_iter().take(excess) {
            jobs.remove(&id);
        }
    }
}

#[async_trait]
impl<C> CreationWorkflow for JobRegistry<C>
where
    C: RemoteTorrentClient + ?Sized + 'static,
{
    async fn start(&self, request: CreationRequest) -> JobResult<Uuid> {
        let request = request.normalized();
        validate_request(&request)?;
        let context = CreationContext::from_settings(&self.config.snapshot()).map_err(|err| {
            CreationError::Validation {
                field: "path_mappings",
                reason: "invalid",
                value: Some(err.to_string()),
            }
        })?;

        self.prune();
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        lock_jobs(&self.jobs).insert(
            id,
            JobEntry {
                snapshot: CreationJob::new(id, request.source_path.clone()),
                cancel: cancel.clone(),
                artifact: None,
            },
        );
        publish(
            &self.events,
            &self.metrics,
            Event::CreationQueued {
                job_id: id,
                source_path: request.source_path.clone(),
            },
        );
        info!(job_id = %id, source_path = %request.source_path, "creation job queued");

        let runner = JobRunner {
            id,
            orchestrator: Arc::clone(&self.orchestrator),
            inspector: Arc::clone(&self.inspector),
            observer: JobObserver {
                id,
                jobs: Arc::clone(&self.jobs),
                events: self.events.clone(),
                metrics: self.metrics.clone(),
            },
        };
        self.tracker
            .spawn(async move { runner.run(request, context, cancel).await });
        Ok(id)
    }

    async fn job(&self, id: Uuid) -> JobResult<CreationJob> {
        lock_jobs(&self.jobs)
            .get(&id)
            .map(|entry| entry.snapshot.clone())
            .ok_or(JobError::UnknownJob { job_id: id })
    }

    async fn cancel(&self, id: Uuid) -> JobResult<CreationJob> {
        let jobs = lock_jobs(&self.jobs);
        let entry = jobs.get(&id).ok_or(JobError::UnknownJob { job_id: id })?;
        if !entry.snapshot.state.is_terminal() {
            entry.cancel.cancel();
            info!(job_id = %id, "creation job cancellation requested");
        }
        Ok(entry.snapshot.clone())
    }

    async fn artifact(&self, id: Uuid) -> JobResult<TorrentArtifact> {
        let jobs = lock_jobs(&self.jobs);
        let entry = jobs.get(&id).ok_or(JobError::UnknownJob { job_id: id })?;
        entry
            .artifact
            .clone()
            .ok_or(JobError::ArtifactUnavailable {
                job_id: id,
                state: entry.snapshot.state.as_str(),
            })
    }

    async fn list(&self) -> Vec<CreationJob> {
        let mut jobs: Vec<_> = lock_jobs(&self.jobs)
            .values()
            .map(|entry| entry.snapshot.clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }
}

struct JobObserver {
    id: Uuid,
    jobs: JobTable,
    events: EventBus,
    metrics: Metrics,
}

impl CreationObserver for JobObserver {
    fn submitted(&self, task_id: &str, used_fallback: bool) {
        update_job(&self.jobs, self.id, |entry| {
            entry.snapshot.state = JobState::Submitted;
            entry.snapshot.task_id = Some(task_id.to_string());
        });
        publish(
            &self.events,
            &self.metrics,
            Event::CreationSubmitted {
                job_id: self.id,
                task_id: task_id.to_string(),
                fallback: used_fallback,
            },
        );
    }

    fn progressed(&self, update: &ProgressUpdate) {
        update_job(&self.jobs, self.id, |entry| {
            if !entry.snapshot.state.is_terminal() {
                entry.snapshot.state = JobState::Polling;
            }
            entry.snapshot.progress_percent = update.percent;
            entry.snapshot.phase = Some(update.phase);
            entry.snapshot.eta_seconds = update.eta_seconds;
        });
        publish(
            &self.events,
            &self.metrics,
            Event::CreationProgress {
                job_id: self.id,
                phase: update.phase,
                percent: update.percent,
                current_file: update.current_file.clone(),
                eta_seconds: update.eta_seconds,
            },
        );
    }
}

impl JobObserver {
    fn completed(&self, outcome: CreationOutcome) {
        let event = Event::CreationCompleted {
            job_id: self.id,
            task_id: outcome.task_id.clone(),
            artifact_name: outcome.artifact.file_name.clone(),
            warnings: outcome.warnings.clone(),
        };
        update_job(&self.jobs, self.id, |entry| {
            let job = &mut entry.snapshot;
            job.state = JobState::Finished;
            job.task_id = Some(outcome.task_id);
            job.progress_percent = 100.0;
            job.phase = Some(TaskPhase::Done);
            job.eta_seconds = None;
            job.artifact_name = Some(outcome.artifact.file_name.clone());
            job.info_hash = outcome.info_hash;
            job.seeded = outcome.seeded;
            job.warnings = outcome.warnings;
            entry.artifact = Some(outcome.artifact);
        });
        info!(job_id = %self.id, "creation job finished");
        publish(&self.events, &self.metrics, event);
    }

    fn failed(&self, error: &CreationError) {
        let failure = JobFailure::from(error);
        let state = if error.kind() == ErrorKind::Cancelled {
            JobState::Cancelled
        } else {
            JobState::Failed
        };
        update_job(&self.jobs, self.id, |entry| {
            let job = &mut entry.snapshot;
            job.state = state;
            job.phase = Some(TaskPhase::Error);
            job.eta_seconds = None;
            if job.task_id.is_none() {
                job.task_id = error.task_id().map(str::to_string);
            }
            job.error = Some(failure.clone());
        });
        warn!(
            job_id = %self.id,
            kind = failure.kind.as_str(),
            detail = failure.detail.as_deref().unwrap_or(""),
            "creation job ended without an artifact"
        );
        publish(
            &self.events,
            &self.metrics,
            Event::CreationFailed {
                job_id: self.id,
                kind: failure.kind,
                message: failure.message,
                detail: failure.detail,
            },
        );
    }
}

struct JobRunner<C: ?Sized> {
    id: Uuid,
    orchestrator: Arc<CreationOrchestrator<C>>,
    inspector: Arc<dyn PathInspector>,
    observer: JobObserver,
}

impl<C> JobRunner<C>
where
    C: RemoteTorrentClient + ?Sized,
{
    async fn run(self, request: CreationRequest, context: CreationContext, cancel: CancellationToken) {
        let result = match self.content_size(&request).await {
            Ok(total_bytes) => {
                self.orchestrator
                    .create_torrent(request, total_bytes, &context, &cancel, &self.observer)
                    .await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => self.observer.completed(outcome),
            Err(err) => self.observer.failed(&err),
        }
    }

    /// Content size for automatic piece sizing.
    ///
    /// Missing or unreadable host paths fail the job; any other scan failure leaves the
    /// piece size to the remote client.
    async fn content_size(&self, request: &CreationRequest) -> CreationResult<Option<u64>> {
        if request.piece_size_mode == PieceSizeMode::Manual {
            return Ok(None);
        }
        match self
            .inspector
            .scan(&request.source_path, request.path_source)
            .await
        {
            Ok(analysis) => Ok(Some(analysis.total_bytes)),
            Err(
                err @ (ListingError::NotFound { .. } | ListingError::PermissionDenied { .. }),
            ) if request.path_source == ListingSource::Local => Err(err.into()),
            Err(err) => {
                warn!(
                    job_id = %self.id,
                    error = %err,
                    "content scan failed; the remote client will choose the piece size"
                );
                Ok(None)
            }
        }
    }
}

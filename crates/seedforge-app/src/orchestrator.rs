//! Drives one torrent creation from submission to cleanup.
//!
//! # Design
//! - A call owns exactly one remote task; its polls are strictly sequential.
//! - Parameters rejected by the remote are resubmitted once with the minimal set.
//! - Deletion and seeding failures become warnings on the outcome.
//! - Settings are read per call through [`CreationContext`], so reloads affect the
//!   next creation only.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use seedforge_config::{ConfigResult, CreationDefaults, QbittorrentConfig, Settings};
use seedforge_core::{
    CreationError, CreationObserver, CreationOutcome, CreationParams, CreationRequest,
    CreationResult, CreationTask, ListingSource, PathMapper, ProgressUpdate, RemoteError,
    RemoteTorrentClient, SeedOptions, TaskStatus, TorrentArtifact, metainfo, resolve_piece_size,
    validate_request,
};
use seedforge_fsops::{normalize_path, parent_path, sanitize_filename};
use seedforge_telemetry::Metrics;
use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval between status polls when nothing is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Longest wait for a remote task when nothing is configured.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Poll cadence and deadline for one creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between status polls.
    pub interval: Duration,
    /// Wait after which the creation times out.
    pub max_wait: Duration,
}

impl PollPolicy {
    /// Policy with explicit values.
    #[must_use]
    pub const fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    /// Policy taken from the creation defaults.
    #[must_use]
    pub const fn from_defaults(defaults: &CreationDefaults) -> Self {
        Self::new(defaults.poll_interval(), defaults.timeout())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_WAIT)
    }
}

/// Category and tags applied to seeded torrents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedingDefaults {
    /// Category assigned on add.
    pub category: Option<String>,
    /// Tags assigned on add.
    pub tags: Vec<String>,
}

impl SeedingDefaults {
    /// Read the seeding defaults from the remote client section.
    #[must_use]
    pub fn from_config(config: &QbittorrentConfig) -> Self {
        Self {
            category: config
                .category
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            tags: config.tags.clone(),
        }
    }
}

/// Settings-derived inputs for one creation.
#[derive(Debug, Clone, Default)]
pub struct CreationContext {
    /// Host to remote translation.
    pub mapper: PathMapper,
    /// Poll cadence.
    pub policy: PollPolicy,
    /// Seeding defaults.
    pub seeding: SeedingDefaults,
}

impl CreationContext {
    /// Build a context from the current settings.
    ///
    /// # Errors
    ///
    /// Returns the mapping error when the configured path mappings are invalid.
    pub fn from_settings(settings: &Settings) -> ConfigResult<Self> {
        Ok(Self {
            mapper: settings.qbittorrent.path_mapper()?,
            policy: PollPolicy::from_defaults(&settings.torrent_creation),
            seeding: SeedingDefaults::from_config(&settings.qbittorrent),
        })
    }
}

/// Creation pipeline over a shared remote client.
pub struct CreationOrchestrator<C: ?Sized> {
    client: Arc<C>,
    metrics: Metrics,
    active: Mutex<HashSet<String>>,
}

struct ActiveTask<'a> {
    active: &'a Mutex<HashSet<String>>,
    task_id: String,
}

impl Drop for ActiveTask<'_> {
    fn drop(&mut self) {
        lock(self.active).remove(&self.task_id);
    }
}

fn lock(active: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C> CreationOrchestrator<C>
where
    C: RemoteTorrentClient + ?Sized,
{
    /// Orchestrator using `client` for every remote call.
    #[must_use]
    pub fn new(client: Arc<C>, metrics: Metrics) -> Self {
        Self {
            client,
            metrics,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// The shared remote client.
    #[must_use]
    pub const fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Validate, submit, poll and finalize one creation.
    ///
    /// `total_bytes` comes from a prior scan and drives automatic piece sizing; without
    /// it the remote client picks the piece size.
    ///
    /// # Errors
    ///
    /// Returns the [`CreationError`] describing why no artifact was produced.
    pub async fn create_torrent(
        &self,
        request: CreationRequest,
        total_bytes: Option<u64>,
        context: &CreationContext,
        cancel: &CancellationToken,
        observer: &dyn CreationObserver,
    ) -> CreationResult<CreationOutcome> {
        self.metrics.creation_started();
        let result = self
            .run(request, total_bytes, context, cancel, observer)
            .await;
        self.metrics.creation_finished();
        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind().as_str(),
        };
        self.metrics.inc_creation(outcome);
        result
    }

    async fn run(
        &self,
        request: CreationRequest,
        total_bytes: Option<u64>,
        context: &CreationContext,
        cancel: &CancellationToken,
        observer: &dyn CreationObserver,
    ) -> CreationResult<CreationOutcome> {
        let request = request.normalized();
        validate_request(&request)?;
        let piece_size = resolve_piece_size(&request, total_bytes)?;
        let remote_path = remote_source_path(&request, &context.mapper);
        if cancel.is_cancelled() {
            return Err(CreationError::Cancelled { task_id: None });
        }

        let params = CreationParams::full(&request, &remote_path, piece_size);
        let mut warnings = Vec::new();
        let (task_id, used_fallback) = self
            .submit_with_fallback(&params, &mut warnings)
            .await
            .map_err(|err| match err {
                RemoteError::PathNotFound { .. } => CreationError::RemotePathNotFound {
                    path: remote_path.clone(),
                },
                other => other.into(),
            })?;
        info!(
            task_id = %task_id,
            remote_path = %remote_path,
            used_fallback,
            "creation task submitted"
        );
        let _active = self.claim(&task_id)?;
        observer.submitted(&task_id, used_fallback);

        let task = self
            .poll_until_terminal(&task_id, context.policy, cancel, observer)
            .await?;
        match task.status {
            TaskStatus::Finished => {
                self.finish(
                    task_id,
                    &request,
                    &remote_path,
                    &context.seeding,
                    used_fallback,
                    warnings,
                )
                .await
            }
            TaskStatus::Failed => {
                self.cleanup(&task_id, &mut warnings).await;
                let message = task
                    .error_message
                    .unwrap_or_else(|| "remote task failed without a message".to_string());
                warn!(task_id = %task_id, message = %message, "remote creation failed");
                Err(CreationError::Failed { task_id, message })
            }
            TaskStatus::Cancelled | TaskStatus::Queued | TaskStatus::Running => {
                self.cleanup(&task_id, &mut warnings).await;
                Err(CreationError::Cancelled {
                    task_id: Some(task_id),
                })
            }
        }
    }

    async fn finish(
        &self,
        task_id: String,
        request: &CreationRequest,
        remote_path: &str,
        seeding: &SeedingDefaults,
        used_fallback: bool,
        mut warnings: Vec<String>,
    ) -> CreationResult<CreationOutcome> {
        let artifact = match self.fetch(&task_id, remote_path).await {
            Ok(artifact) => artifact,
            Err(err) => {
                self.cleanup(&task_id, &mut warnings).await;
                return Err(err);
            }
        };
        let info_hash = match metainfo::info_hash(&artifact.bytes, request.format) {
            Ok(hash) => Some(hash),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "metainfo could not be hashed");
                warnings.push(format!("info hash unavailable: {err}"));
                None
            }
        };
        self.cleanup(&task_id, &mut warnings).await;
        let seeded = if request.start_seeding {
            let options = SeedOptions {
                save_path: parent_path(remote_path).unwrap_or_else(|| "/".to_string()),
                category: seeding.category.clone(),
                tags: seeding.tags.clone(),
                ignore_share_ratio: request.ignore_share_ratio,
                info_hash: info_hash.clone(),
            };
            self.seed(&artifact.bytes, &options, &mut warnings).await
        } else {
            false
        };
        info!(
            task_id = %task_id,
            artifact = %artifact.file_name,
            seeded,
            warnings = warnings.len(),
            "creation finished"
        );
        Ok(CreationOutcome {
            task_id,
            artifact,
            info_hash,
            seeded,
            used_fallback,
            warnings,
        })
    }

    /// Submit `params`; when the remote rejects them, resubmit once with path and format.
    async fn submit_with_fallback(
        &self,
        params: &CreationParams,
        warnings: &mut Vec<String>,
    ) -> Result<(String, bool), RemoteError> {
        match self.client.submit_creation_task(params).await {
            Ok(task_id) => Ok((task_id, false)),
            Err(RemoteError::UnsupportedParameters { detail }) if !params.is_minimal() => {
                warn!(
                    detail = %detail,
                    "remote rejected creation parameters; retrying with path and format only"
                );
                self.metrics.inc_creation_fallback();
                warnings.push(format!(
                    "remote client rejected optional parameters ({detail}); created with its defaults"
                ));
                if params.comment.is_some() || params.source.is_some() {
                    warnings.push("comment and source tag were not applied".to_string());
                }
                let minimal = CreationParams::minimal(&params.source_path, params.format);
                let task_id = self.client.submit_creation_task(&minimal).await?;
                Ok((task_id, true))
            }
            Err(err) => Err(err),
        }
    }

    fn claim(&self, task_id: &str) -> CreationResult<ActiveTask<'_>> {
        if !lock(&self.active).insert(task_id.to_string()) {
            return Err(CreationError::Remote {
                operation: "submit_creation_task",
                status: None,
                detail: format!("task {task_id} is already being polled"),
            });
        }
        Ok(ActiveTask {
            active: &self.active,
            task_id: task_id.to_string(),
        })
    }

    async fn poll_until_terminal(
        &self,
        task_id: &str,
        policy: PollPolicy,
        cancel: &CancellationToken,
        observer: &dyn CreationObserver,
    ) -> CreationResult<CreationTask> {
        let started = Instant::now();
        let deadline = started + policy.max_wait;
        loop {
            let polled = tokio::select! {
                biased;
                () = cancel.cancelled() => return self.cancelled(task_id).await,
                polled = timeout_at(deadline, self.client.task_status(task_id)) => polled,
            };
            let Ok(status) = polled else {
                return Err(timed_out(task_id, started));
            };
            self.metrics.inc_remote_poll();
            let task = status?;
            let update = ProgressUpdate {
                task_id: task_id.to_string(),
                phase: task.current_phase,
                percent: task.progress_percent,
                current_file: None,
                eta_seconds: estimate_eta(started.elapsed(), task.progress_percent),
            };
            debug!(
                task_id,
                status = ?task.status,
                percent = task.progress_percent,
                "creation task polled"
            );
            observer.progressed(&update);
            if task.status.is_terminal() {
                return Ok(task);
            }

            let wake = deadline.min(Instant::now() + policy.interval);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return self.cancelled(task_id).await,
                () = sleep_until(wake) => {}
            }
            if Instant::now() >= deadline {
                return Err(timed_out(task_id, started));
            }
        }
    }

    /// Stop polling. A task that already finished is still finalized.
    async fn cancelled(&self, task_id: &str) -> CreationResult<CreationTask> {
        if let Ok(task) = self.client.task_status(task_id).await
            && task.status == TaskStatus::Finished
        {
            info!(task_id, "cancellation arrived after the task finished");
            return Ok(task);
        }
        let mut warnings = Vec::new();
        self.cleanup(task_id, &mut warnings).await;
        info!(task_id, "creation cancelled");
        Err(CreationError::Cancelled {
            task_id: Some(task_id.to_string()),
        })
    }

    async fn fetch(&self, task_id: &str, remote_path: &str) -> CreationResult<TorrentArtifact> {
        let bytes = self.client.fetch_artifact(task_id).await?;
        if bytes.is_empty() {
            return Err(CreationError::Remote {
                operation: "fetch_artifact",
                status: None,
                detail: format!("task {task_id} produced an empty metainfo file"),
            });
        }
        let file_name = artifact_file_name(&bytes, remote_path);
        Ok(TorrentArtifact { bytes, file_name })
    }

    async fn cleanup(&self, task_id: &str, warnings: &mut Vec<String>) {
        if let Err(err) = self.client.delete_task(task_id).await {
            warn!(task_id, error = %err, "remote task could not be deleted");
            self.metrics.inc_cleanup_failure();
            warnings.push(format!("remote task {task_id} was not deleted: {err}"));
        }
    }

    async fn seed(&self, bytes: &[u8], options: &SeedOptions, warnings: &mut Vec<String>) -> bool {
        match self.client.add_and_seed(bytes, options).await {
            Ok(()) => {
                info!(save_path = %options.save_path, "torrent added for seeding");
                true
            }
            Err(err) => {
                warn!(save_path = %options.save_path, error = %err, "seeding failed");
                self.metrics.inc_cleanup_failure();
                warnings.push(format!("seeding failed: {err}"));
                false
            }
        }
    }
}

fn remote_source_path(request: &CreationRequest, mapper: &PathMapper) -> String {
    let path = normalize_path(&request.source_path);
    match request.path_source {
        ListingSource::Local => mapper.to_remote(&path),
        ListingSource::Remote => path,
    }
}

fn timed_out(task_id: &str, started: Instant) -> CreationError {
    let waited_secs = started.elapsed().as_secs();
    warn!(task_id, waited_secs, "creation timed out; remote task left in place");
    CreationError::Timeout {
        task_id: task_id.to_string(),
        waited_secs,
    }
}

/// `<info.name>.torrent`, falling back to the last path segment.
fn artifact_file_name(bytes: &[u8], remote_path: &str) -> String {
    let name = metainfo::torrent_name(bytes)
        .ok()
        .flatten()
        .or_else(|| {
            remote_path
                .rsplit('/')
                .find(|segment| !segment.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default();
    format!("{}.torrent", sanitize_filename(&name))
}

/// Seconds left, assuming the remaining progress continues at the observed rate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn estimate_eta(elapsed: Duration, percent: f64) -> Option<u64> {
    if percent.is_nan() || percent <= 0.0 || percent >= 100.0 {
        return None;
    }
    let remaining = elapsed.as_secs_f64() * (100.0 - percent) / percent;
    Some(remaining.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedforge_core::{ErrorKind, PathMapping, PieceSizeMode, TaskPhase};
    use seedforge_test_support::{RemoteCall, SAMPLE_TORRENT, ScriptedFailure, ScriptedRemote, StatusStep};

    #[derive(Default)]
    struct RecordingObserver {
        submitted: Mutex<Vec<(String, bool)>>,
        updates: Mutex<Vec<ProgressUpdate>>,
    }

    impl CreationObserver for RecordingObserver {
        fn submitted(&self, task_id: &str, used_fallback: bool) {
            self.submitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((task_id.to_string(), used_fallback));
        }

        fn progressed(&self, update: &ProgressUpdate) {
            self.updates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(update.clone());
        }
    }

    impl RecordingObserver {
        fn phases(&self) -> Vec<TaskPhase> {
            self.updates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|update| update.phase)
                .collect()
        }
    }

    fn context() -> anyhow::Result<CreationContext> {
        Ok(CreationContext {
            mapper: PathMapper::new([PathMapping::new("/mnt/user/data", "/data")])?,
            policy: PollPolicy::new(Duration::from_millis(1), Duration::from_secs(5)),
            seeding: SeedingDefaults {
                category: Some("uploads".into()),
                tags: vec!["seedforge".into()],
            },
        })
    }

    fn orchestrator(remote: ScriptedRemote) -> anyhow::Result<CreationOrchestrator<ScriptedRemote>> {
        Ok(CreationOrchestrator::new(Arc::new(remote), Metrics::new()?))
    }

    fn request() -> CreationRequest {
        CreationRequest::new("/mnt/user/data/downloads/movie")
    }

    async fn create(
        orchestrator: &CreationOrchestrator<ScriptedRemote>,
        request: CreationRequest,
        observer: &RecordingObserver,
    ) -> anyhow::Result<CreationResult<CreationOutcome>> {
        Ok(orchestrator
            .create_torrent(
                request,
                Some(10_000_000_000),
                &context()?,
                &CancellationToken::new(),
                observer,
            )
            .await)
    }

    #[tokio::test]
    async fn queued_running_finished_produces_artifact() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().with_statuses([
            StatusStep::Report(TaskStatus::Queued, 0.0),
            StatusStep::Report(TaskStatus::Running, 50.0),
            StatusStep::Report(TaskStatus::Finished, 100.0),
        ]);
        let orchestrator = orchestrator(remote)?;
        let observer = RecordingObserver::default();

        let outcome = create(&orchestrator, request(), &observer).await??;

        assert_eq!(outcome.task_id, "task-1");
        assert!(!outcome.artifact.bytes.is_empty());
        assert_eq!(outcome.artifact.file_name, "movie.torrent");
        assert_eq!(outcome.info_hash.as_deref().map(str::len), Some(40));
        assert!(!outcome.used_fallback && !outcome.seeded);
        assert!(outcome.warnings.is_empty());

        let remote = orchestrator.client();
        assert_eq!(remote.status_polls(), 3);
        assert_eq!(remote.deletions(), 1);
        let submitted = remote.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].source_path, "/data/downloads/movie");
        assert_eq!(submitted[0].piece_size, Some(4 * 1024 * 1024));
        assert_eq!(
            observer.phases(),
            vec![TaskPhase::Scanning, TaskPhase::Hashing, TaskPhase::Done]
        );
        assert_eq!(
            observer
                .submitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_slice(),
            &[("task-1".to_string(), false)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn busy_remote_is_not_polled() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().with_submits([Err(ScriptedFailure::Busy)]);
        let orchestrator = orchestrator(remote)?;

        let result = create(&orchestrator, request(), &RecordingObserver::default()).await?;

        assert!(matches!(result, Err(CreationError::Busy)));
        assert_eq!(orchestrator.client().status_polls(), 0);
        assert_eq!(orchestrator.client().submitted().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_remote() -> anyhow::Result<()> {
        let orchestrator = orchestrator(ScriptedRemote::new())?;
        let mut bad = request();
        bad.piece_size_mode = PieceSizeMode::Manual;
        bad.piece_size_bytes = Some(100_000);

        let result = create(&orchestrator, bad, &RecordingObserver::default()).await?;

        assert!(matches!(
            result,
            Err(CreationError::InvalidPieceSize { value: 100_000 })
        ));
        assert!(orchestrator.client().calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_parameters_are_retried_once_with_minimal_set() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().with_submits([
            Err(ScriptedFailure::UnsupportedParameters("pieceSize".into())),
            Ok("task-9".into()),
        ]);
        let orchestrator = orchestrator(remote)?;
        let observer = RecordingObserver::default();
        let mut request = request();
        request.comment = "hello".into();
        request.format = seedforge_core::TorrentFormat::Hybrid;

        let outcome = create(&orchestrator, request, &observer).await??;

        assert!(outcome.used_fallback);
        assert_eq!(outcome.task_id, "task-9");
        assert_eq!(outcome.warnings.len(), 2);
        let submitted = orchestrator.client().submitted();
        assert_eq!(submitted.len(), 2);
        assert!(!submitted[0].is_minimal());
        assert!(submitted[1].is_minimal());
        assert_eq!(submitted[1].format, seedforge_core::TorrentFormat::Hybrid);
        Ok(())
    }

    #[tokio::test]
    async fn second_rejection_is_not_retried() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().with_submits([
            Err(ScriptedFailure::UnsupportedParameters("pieceSize".into())),
            Err(ScriptedFailure::UnsupportedParameters("format".into())),
        ]);
        let orchestrator = orchestrator(remote)?;

        let result = create(&orchestrator, request(), &RecordingObserver::default()).await?;

        assert_eq!(
            result.err().map(|err| err.kind()),
            Some(ErrorKind::UnsupportedParameters)
        );
        assert_eq!(orchestrator.client().submitted().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn missing_remote_path_reports_translated_path() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new()
            .with_submits([Err(ScriptedFailure::PathNotFound("ignored".into()))]);
        let orchestrator = orchestrator(remote)?;

        let result = create(&orchestrator, request(), &RecordingObserver::default()).await?;

        assert!(matches!(
            result,
            Err(CreationError::RemotePathNotFound { path }) if path == "/data/downloads/movie"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn failed_deletion_becomes_a_warning() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().failing_delete(ScriptedFailure::Connection);
        let orchestrator = orchestrator(remote)?;

        let outcome = create(&orchestrator, request(), &RecordingObserver::default()).await??;

        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("task-1"));
        Ok(())
    }

    #[tokio::test]
    async fn remote_failure_keeps_message_and_cleans_up() -> anyhow::Result<()> {
        let remote =
            ScriptedRemote::new().with_statuses([StatusStep::Failed("disk full".into())]);
        let orchestrator = orchestrator(remote)?;

        let result = create(&orchestrator, request(), &RecordingObserver::default()).await?;

        assert!(matches!(
            result,
            Err(CreationError::Failed { message, .. }) if message == "disk full"
        ));
        assert_eq!(orchestrator.client().deletions(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn artifact_download_failure_still_deletes_task() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().with_artifact(Err(ScriptedFailure::Connection));
        let orchestrator = orchestrator(remote)?;

        let result = create(&orchestrator, request(), &RecordingObserver::default()).await?;

        assert!(result.is_err());
        assert_eq!(orchestrator.client().deletions(), 1);
        assert!(orchestrator.client().seeded().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_artifact_still_deletes_task() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().with_artifact(Ok(Vec::new()));
        let orchestrator = orchestrator(remote)?;

        let result = create(&orchestrator, request(), &RecordingObserver::default()).await?;

        assert!(matches!(
            result,
            Err(CreationError::Remote { operation: "fetch_artifact", .. })
        ));
        assert_eq!(orchestrator.client().deletions(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn timeout_leaves_the_remote_task() -> anyhow::Result<()> {
        let remote =
            ScriptedRemote::new().with_statuses([StatusStep::Report(TaskStatus::Running, 10.0)]);
        let orchestrator = orchestrator(remote)?;
        let mut context = context()?;
        context.policy = PollPolicy::new(Duration::from_millis(5), Duration::from_millis(30));

        let result = orchestrator
            .create_torrent(
                request(),
                None,
                &context,
                &CancellationToken::new(),
                &RecordingObserver::default(),
            )
            .await;

        assert!(matches!(
            result,
            Err(CreationError::Timeout { task_id, .. }) if task_id == "task-1"
        ));
        assert_eq!(orchestrator.client().deletions(), 0);
        assert!(orchestrator.client().status_polls() >= 1);
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_stops_polling_and_deletes_task() -> anyhow::Result<()> {
        let remote =
            ScriptedRemote::new().with_statuses([StatusStep::Report(TaskStatus::Running, 10.0)]);
        let orchestrator = orchestrator(remote)?;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = orchestrator
            .create_torrent(
                request(),
                None,
                &context()?,
                &cancel,
                &RecordingObserver::default(),
            )
            .await;

        assert!(matches!(
            result,
            Err(CreationError::Cancelled { task_id: Some(id) }) if id == "task-1"
        ));
        assert_eq!(orchestrator.client().deletions(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn cancelling_a_finished_task_reports_finished() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new()
            .with_statuses([
                StatusStep::Report(TaskStatus::Running, 90.0),
                StatusStep::Report(TaskStatus::Finished, 100.0),
            ])
            .with_status_delay(Duration::from_millis(30));
        let orchestrator = orchestrator(remote)?;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let outcome = orchestrator
            .create_torrent(
                request(),
                None,
                &context()?,
                &cancel,
                &RecordingObserver::default(),
            )
            .await?;

        assert_eq!(outcome.artifact.bytes, SAMPLE_TORRENT);
        Ok(())
    }

    #[tokio::test]
    async fn seeding_uses_parent_of_translated_path() -> anyhow::Result<()> {
        let orchestrator = orchestrator(ScriptedRemote::new())?;
        let mut request = request();
        request.start_seeding = true;
        request.ignore_share_ratio = true;

        let outcome = create(&orchestrator, request, &RecordingObserver::default()).await??;

        assert!(outcome.seeded);
        let seeded = orchestrator.client().seeded();
        assert_eq!(seeded.len(), 1);
        assert_eq!(seeded[0].save_path, "/data/downloads");
        assert_eq!(seeded[0].category.as_deref(), Some("uploads"));
        assert!(seeded[0].ignore_share_ratio);
        assert_eq!(seeded[0].info_hash, outcome.info_hash);
        let calls = orchestrator.client().calls();
        let delete_at = calls.iter().position(|call| matches!(call, RemoteCall::Delete(_)));
        let seed_at = calls.iter().position(|call| matches!(call, RemoteCall::Seed(_)));
        assert!(delete_at < seed_at);
        Ok(())
    }

    #[tokio::test]
    async fn seeding_failure_keeps_success() -> anyhow::Result<()> {
        let remote = ScriptedRemote::new().failing_seed(ScriptedFailure::Protocol("415".into()));
        let orchestrator = orchestrator(remote)?;
        let mut request = request();
        request.start_seeding = true;

        let outcome = create(&orchestrator, request, &RecordingObserver::default()).await??;

        assert!(!outcome.seeded);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("seeding failed"));
        Ok(())
    }

    #[tokio::test]
    async fn remote_paths_are_not_mapped() -> anyhow::Result<()> {
        let orchestrator = orchestrator(ScriptedRemote::new())?;
        let mut request = CreationRequest::new("/mnt/user/data/x");
        request.path_source = ListingSource::Remote;

        create(&orchestrator, request, &RecordingObserver::default()).await??;

        assert_eq!(
            orchestrator.client().submitted()[0].source_path,
            "/mnt/user/data/x"
        );
        Ok(())
    }

    #[test]
    fn eta_follows_observed_rate() {
        assert_eq!(estimate_eta(Duration::from_secs(10), 25.0), Some(30));
        assert_eq!(estimate_eta(Duration::from_secs(10), 0.0), None);
        assert_eq!(estimate_eta(Duration::from_secs(10), 100.0), None);
    }

    #[test]
    fn file_name_falls_back_to_path_segment() {
        assert_eq!(artifact_file_name(SAMPLE_TORRENT, "/data/x"), "movie.torrent");
        assert_eq!(artifact_file_name(b"garbage", "/data/my:show/"), "my_show.torrent");
    }
}

#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the seedforge public API.
//!
//! These types are re-used by the CLI for request/response encoding to keep the
//! contract deterministic. Domain types that already serialise cleanly
//! (`PathAnalysis`, `PieceSizePlan`, `DirectoryListing`, `CreationJob`) are re-exported
//! rather than mirrored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use seedforge_config::CreationDefaults;
pub use seedforge_core::{
    ConnectionInfo, ContentMode, CreationJob, CreationRequest, DiagnosticLevel, DirectoryEntry,
    DirectoryListing, EntryKind, ErrorKind, JobFailure, JobState, ListingSource, PathAnalysis,
    PathMapping, PieceSizeMode, PieceSizePlan, TaskPhase, TorrentFormat,
};

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parameters that failed validation, if applicable.
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON Pointer to the offending field.
    pub pointer: String,
    /// Human-readable description of the validation failure.
    pub message: String,
}

/// Body of `POST /v1/scan`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRequest {
    /// Path to analyse.
    pub path: String,
    /// Namespace the path belongs to.
    #[serde(default)]
    pub source: ListingSource,
}

/// Scan result with a human-readable size and the suggested sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanResponse {
    /// Raw analysis.
    #[serde(flatten)]
    pub analysis: PathAnalysis,
    /// `total_bytes` formatted for display.
    pub total_size: String,
    /// Plan for the configured target piece count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_plan: Option<PieceSizePlan>,
}

/// Body of `POST /v1/pieces`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PiecesRequest {
    /// Content size in bytes.
    pub total_bytes: u64,
    /// Piece count to aim for; the configured default when absent.
    #[serde(default)]
    pub target_piece_count: Option<u64>,
    /// Manual piece size override.
    #[serde(default)]
    pub piece_size: Option<u64>,
}

/// Piece plan plus display strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PiecesResponse {
    /// Computed plan.
    #[serde(flatten)]
    pub plan: PieceSizePlan,
    /// Piece size formatted for display.
    pub piece_size: String,
    /// Content size formatted for display.
    pub total_size: String,
}

/// Query string of `GET /v1/browse`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowseQuery {
    /// Directory to list; `/` when absent.
    #[serde(default)]
    pub path: Option<String>,
    /// Namespace to list in.
    #[serde(default)]
    pub source: ListingSource,
}

/// Response of `GET /v1/browse/roots`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootsResponse {
    /// Existing starting points, `/` first.
    pub roots: Vec<String>,
}

/// Mapping finding in wire form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingDiagnosticView {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Machine-readable code.
    pub code: String,
    /// Explanation.
    pub message: String,
}

/// Response of `GET /v1/paths/mappings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingsResponse {
    /// Configured mapping table in declaration order.
    pub mappings: Vec<PathMapping>,
    /// Findings about the table.
    pub diagnostics: Vec<MappingDiagnosticView>,
}

/// Translation direction for `POST /v1/paths/map`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MapDirection {
    /// Host path to the remote client's namespace.
    #[default]
    ToRemote,
    /// Remote path back to the host namespace.
    ToHost,
}

/// Body of `POST /v1/paths/map`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapRequest {
    /// Path to translate.
    pub path: String,
    /// Translation direction.
    #[serde(default)]
    pub direction: MapDirection,
}

/// Response of `POST /v1/paths/map`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapResponse {
    /// Path as given.
    pub input: String,
    /// Translated path.
    pub output: String,
    /// Direction applied.
    pub direction: MapDirection,
    /// Whether a mapping rule matched.
    pub mapped: bool,
}

/// Body of `POST /v1/creations`; omitted fields fall back to configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTorrentRequest {
    /// Content path.
    pub path: String,
    /// Namespace of `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_source: Option<ListingSource>,
    /// Sizing mode; `auto` discards a configured fixed size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_size_mode: Option<PieceSizeMode>,
    /// Manual piece size; implies manual mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_size: Option<u64>,
    /// Piece count to aim for in auto mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_piece_count: Option<u64>,
    /// Private flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    /// Seed after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seeding: Option<bool>,
    /// Disable share limits while seeding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_share_ratio: Option<bool>,
    /// Align files to piece boundaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize_alignment: Option<bool>,
    /// Padding threshold when aligning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padded_file_size_limit: Option<u64>,
    /// Tracker tiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackers: Option<Vec<Vec<String>>>,
    /// Web seeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_seeds: Option<Vec<String>>,
    /// Comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Source tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Metainfo layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TorrentFormat>,
}

impl CreateTorrentRequest {
    /// Request for `path` with every other field left to the server defaults.
    #[must_use]
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Domain request with omitted fields filled from `defaults`.
    #[must_use]
    pub fn into_request(self, defaults: &CreationDefaults) -> CreationRequest {
        let mut request = defaults.request_for(self.path);
        if let Some(source) = self.path_source {
            request.path_source = source;
        }
        match (self.piece_size_mode, self.piece_size) {
            (_, Some(size)) => {
                request.piece_size_mode = PieceSizeMode::Manual;
                request.piece_size_bytes = Some(size);
            }
            (Some(PieceSizeMode::Auto), None) => {
                request.piece_size_mode = PieceSizeMode::Auto;
                request.piece_size_bytes = None;
            }
            (Some(PieceSizeMode::Manual), None) => {
                request.piece_size_mode = PieceSizeMode::Manual;
            }
            (None, None) => {}
        }
        if let Some(target) = self.target_piece_count {
            request.target_piece_count = target;
        }
        if let Some(private) = self.private {
            request.is_private = private;
        }
        if let Some(seed) = self.start_seeding {
            request.start_seeding = seed;
        }
        if let Some(ignore) = self.ignore_share_ratio {
            request.ignore_share_ratio = ignore;
        }
        if let Some(align) = self.optimize_alignment {
            request.optimize_alignment = align;
        }
        if self.padded_file_size_limit.is_some() {
            request.alignment_threshold_bytes = self.padded_file_size_limit;
        }
        if let Some(trackers) = self.trackers {
            request.announce_tiers = trackers;
        }
        if let Some(seeds) = self.url_seeds {
            request.web_seeds = seeds;
        }
        if let Some(comment) = self.comment {
            request.comment = comment;
        }
        if let Some(source) = self.source {
            request.source = source;
        }
        if let Some(format) = self.format {
            request.format = format;
        }
        request
    }
}

/// Response of `POST /v1/creations` (202 Accepted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreationAccepted {
    /// Job identifier.
    pub job_id: Uuid,
    /// Snapshot URL.
    pub status_url: String,
    /// Progress stream URL.
    pub events_url: String,
}

impl CreationAccepted {
    /// Links for a freshly started job.
    #[must_use]
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            status_url: creation_path(job_id),
            events_url: events_path(job_id),
        }
    }
}

/// Final outcome of a creation, present once the job is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreationResultDto {
    /// True when a torrent was produced.
    pub success: bool,
    /// Remote task identifier, when one was assigned.
    pub task_id: Option<String>,
    /// Download link for the artifact.
    pub artifact_ref: Option<String>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
    /// Failure details.
    pub error: Option<JobFailure>,
}

impl CreationResultDto {
    /// Outcome of a terminal job, `None` while it is still running.
    #[must_use]
    pub fn from_job(job: &CreationJob) -> Option<Self> {
        if !job.state.is_terminal() {
            return None;
        }
        let success = job.state == JobState::Finished;
        Some(Self {
            success,
            task_id: job.task_id.clone(),
            artifact_ref: success.then(|| artifact_path(job.id)),
            warnings: job.warnings.clone(),
            error: job.error.clone(),
        })
    }
}

/// Job snapshot with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreationJobResponse {
    /// Snapshot.
    #[serde(flatten)]
    pub job: CreationJob,
    /// Outcome once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CreationResultDto>,
}

impl From<CreationJob> for CreationJobResponse {
    fn from(job: CreationJob) -> Self {
        let result = CreationResultDto::from_job(&job);
        Self { job, result }
    }
}

/// Response of `GET /v1/creations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreationListResponse {
    /// Jobs, newest first.
    pub jobs: Vec<CreationJobResponse>,
}

/// Snapshot path for a job.
#[must_use]
pub fn creation_path(job_id: Uuid) -> String {
    format!("/v1/creations/{job_id}")
}

/// Artifact download path for a job.
#[must_use]
pub fn artifact_path(job_id: Uuid) -> String {
    format!("/v1/creations/{job_id}/artifact")
}

/// Progress stream path for a job.
#[must_use]
pub fn events_path(job_id: Uuid) -> String {
    format!("/v1/creations/{job_id}/events")
}

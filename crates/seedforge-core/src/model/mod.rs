//! Domain types shared across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CreationError, ErrorKind};

/// Default number of pieces the auto sizing aims for.
pub const DEFAULT_TARGET_PIECE_COUNT: u64 = 2500;

/// How the piece size for a creation is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PieceSizeMode {
    /// Derive the piece size from the content size and target count.
    #[default]
    Auto,
    /// Use the caller-supplied piece size.
    Manual,
}

/// Metainfo layout produced by the remote client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TorrentFormat {
    /// `BitTorrent` v1.
    #[default]
    V1,
    /// `BitTorrent` v2.
    V2,
    /// Hybrid v1 + v2.
    Hybrid,
}

impl TorrentFormat {
    /// Wire label accepted by the remote creator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parse a wire label, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

/// Namespace a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    /// Host filesystem; mapped to the remote namespace before submission.
    #[default]
    Local,
    /// Remote client filesystem; submitted as-is.
    Remote,
}

/// Immutable input to a creation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationRequest {
    /// Absolute path of the content to package.
    pub source_path: String,
    /// Namespace `source_path` is expressed in.
    #[serde(default)]
    pub path_source: ListingSource,
    /// Piece sizing strategy.
    #[serde(default)]
    pub piece_size_mode: PieceSizeMode,
    /// Manual piece size in bytes; required when `piece_size_mode` is manual.
    #[serde(default)]
    pub piece_size_bytes: Option<u64>,
    /// Piece count the auto sizing aims for.
    #[serde(default = "default_target_piece_count")]
    pub target_piece_count: u64,
    /// Set the private flag.
    #[serde(default)]
    pub is_private: bool,
    /// Add the finished torrent to the remote client for seeding.
    #[serde(default)]
    pub start_seeding: bool,
    /// Disable share ratio and seeding time limits on the seeded torrent.
    #[serde(default)]
    pub ignore_share_ratio: bool,
    /// Ask the remote creator to align files to piece boundaries.
    #[serde(default)]
    pub optimize_alignment: bool,
    /// Minimum file size that receives padding when alignment is enabled.
    #[serde(default)]
    pub alignment_threshold_bytes: Option<u64>,
    /// Tracker tiers, in announce order.
    #[serde(default)]
    pub announce_tiers: Vec<Vec<String>>,
    /// Web seed URLs.
    #[serde(default)]
    pub web_seeds: Vec<String>,
    /// Free-form comment.
    #[serde(default)]
    pub comment: String,
    /// Source tag written into the info dictionary.
    #[serde(default)]
    pub source: String,
    /// Metainfo layout.
    #[serde(default)]
    pub format: TorrentFormat,
}

const fn default_target_piece_count() -> u64 {
    DEFAULT_TARGET_PIECE_COUNT
}

impl CreationRequest {
    /// Request for `source_path` with every option at its default.
    #[must_use]
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            path_source: ListingSource::Local,
            piece_size_mode: PieceSizeMode::Auto,
            piece_size_bytes: None,
            target_piece_count: DEFAULT_TARGET_PIECE_COUNT,
            is_private: false,
            start_seeding: false,
            ignore_share_ratio: false,
            optimize_alignment: false,
            alignment_threshold_bytes: None,
            announce_tiers: Vec::new(),
            web_seeds: Vec::new(),
            comment: String::new(),
            source: String::new(),
            format: TorrentFormat::V1,
        }
    }

    /// Apply the silent corrections: `ignore_share_ratio` only survives with seeding,
    /// web seeds are de-duplicated in insertion order and blank entries are dropped.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.start_seeding {
            self.ignore_share_ratio = false;
        }
        let mut seen = Vec::with_capacity(self.web_seeds.len());
        for seed in self.web_seeds.drain(..) {
            let seed = seed.trim().to_string();
            if !seed.is_empty() && !seen.contains(&seed) {
                seen.push(seed);
            }
        }
        self.web_seeds = seen;
        self.announce_tiers = self
            .announce_tiers
            .into_iter()
            .map(|tier| {
                tier.into_iter()
                    .map(|url| url.trim().to_string())
                    .collect()
            })
            .collect();
        self
    }
}

/// Whether scanned content is a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Single file.
    File,
    /// Directory tree.
    Folder,
}

/// Result of scanning a source path. Computed fresh on each scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathAnalysis {
    /// Path that was scanned.
    pub path: String,
    /// Whether the path exists.
    pub exists: bool,
    /// File or folder.
    pub mode: ContentMode,
    /// Sum of all file sizes.
    pub total_bytes: u64,
    /// Number of regular files.
    pub file_count: u64,
    /// Number of directories below the root.
    pub folder_count: u64,
    /// True when a directory held more entries than the per-directory cap.
    pub truncated: bool,
    /// Human-readable notes about the scan.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Output of the piece size calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceSizePlan {
    /// Piece size in bytes.
    pub piece_size_bytes: u64,
    /// Number of pieces covering the content.
    pub piece_count: u64,
    /// Share of the final piece space holding content, 0..=100.
    pub efficiency_percent: f64,
    /// Bytes of padding in the final piece.
    pub wasted_bytes: u64,
}

/// Remote creation task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the remote queue.
    Queued,
    /// Being hashed.
    Running,
    /// Metainfo ready for download.
    Finished,
    /// Remote creation failed.
    Failed,
    /// Stopped at the caller's request.
    Cancelled,
}

impl TaskStatus {
    /// True once no further transitions occur.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }
}

/// Coarse progress phase presented to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// Remote is enumerating the content.
    Scanning,
    /// Pieces are being hashed.
    Hashing,
    /// Hashing is complete; metainfo is being written.
    Finalizing,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Error,
}

impl TaskPhase {
    /// Derive the phase from a remote status and progress.
    #[must_use]
    pub fn from_status(status: TaskStatus, progress_percent: f64) -> Self {
        match status {
            TaskStatus::Queued => Self::Scanning,
            TaskStatus::Running if progress_percent >= 100.0 => Self::Finalizing,
            TaskStatus::Running => Self::Hashing,
            TaskStatus::Finished => Self::Done,
            TaskStatus::Failed | TaskStatus::Cancelled => Self::Error,
        }
    }
}

/// Mutable state of one remote creation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationTask {
    /// Identifier assigned by the remote client.
    pub task_id: String,
    /// Remote status.
    pub status: TaskStatus,
    /// Progress, 0..=100.
    pub progress_percent: f64,
    /// Derived phase.
    pub current_phase: TaskPhase,
    /// Remote error text when failed.
    pub error_message: Option<String>,
    /// Metainfo bytes once finished and fetched.
    #[serde(skip)]
    pub result_artifact: Option<Vec<u8>>,
}

impl CreationTask {
    /// Build a task snapshot, deriving the phase.
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        status: TaskStatus,
        progress_percent: f64,
        error_message: Option<String>,
    ) -> Self {
        let progress_percent = progress_percent.clamp(0.0, 100.0);
        Self {
            task_id: task_id.into(),
            status,
            progress_percent,
            current_phase: TaskPhase::from_status(status, progress_percent),
            error_message,
            result_artifact: None,
        }
    }
}

/// Parameters submitted to the remote creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationParams {
    /// Source path in the remote namespace.
    pub source_path: String,
    /// Metainfo layout.
    pub format: TorrentFormat,
    /// Piece size in bytes.
    pub piece_size: Option<u64>,
    /// Private flag.
    pub private: Option<bool>,
    /// Piece alignment toggle.
    pub optimize_alignment: Option<bool>,
    /// Padding threshold.
    pub padded_file_size_limit: Option<u64>,
    /// Comment.
    pub comment: Option<String>,
    /// Source tag.
    pub source: Option<String>,
    /// Tracker tiers.
    pub trackers: Vec<Vec<String>>,
    /// Web seeds.
    pub url_seeds: Vec<String>,
}

impl CreationParams {
    /// Full parameter set for a validated request.
    #[must_use]
    pub fn full(request: &CreationRequest, remote_path: &str, piece_size: Option<u64>) -> Self {
        let non_empty = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            source_path: remote_path.to_string(),
            format: request.format,
            piece_size,
            private: Some(request.is_private),
            optimize_alignment: Some(request.optimize_alignment),
            padded_file_size_limit: if request.optimize_alignment {
                request.alignment_threshold_bytes
            } else {
                None
            },
            comment: non_empty(&request.comment),
            source: non_empty(&request.source),
            trackers: request.announce_tiers.clone(),
            url_seeds: request.web_seeds.clone(),
        }
    }

    /// Minimal parameter set used for the single fallback attempt.
    #[must_use]
    pub fn minimal(remote_path: &str, format: TorrentFormat) -> Self {
        Self {
            source_path: remote_path.to_string(),
            format,
            piece_size: None,
            private: None,
            optimize_alignment: None,
            padded_file_size_limit: None,
            comment: None,
            source: None,
            trackers: Vec::new(),
            url_seeds: Vec::new(),
        }
    }

    /// True when only the path and format are set.
    #[must_use]
    pub fn is_minimal(&self) -> bool {
        *self == Self::minimal(&self.source_path, self.format)
    }
}

/// Options for adding a freshly created torrent to the remote client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOptions {
    /// Directory holding the content, in the remote namespace.
    pub save_path: String,
    /// Category assigned to the torrent.
    pub category: Option<String>,
    /// Tags assigned to the torrent.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Disable ratio and seeding time limits.
    pub ignore_share_ratio: bool,
    /// Info hash used to request a recheck after adding.
    pub info_hash: Option<String>,
}

/// Downloadable `.torrent` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentArtifact {
    /// Bencoded metainfo.
    pub bytes: Vec<u8>,
    /// Suggested file name ending in `.torrent`.
    pub file_name: String,
}

/// Successful creation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOutcome {
    /// Remote task identifier.
    pub task_id: String,
    /// Metainfo payload.
    pub artifact: TorrentArtifact,
    /// Info hash (hex) when the payload could be parsed.
    pub info_hash: Option<String>,
    /// True when the torrent was added for seeding.
    pub seeded: bool,
    /// True when the minimal fallback submission was used.
    pub used_fallback: bool,
    /// Non-fatal issues encountered along the way.
    pub warnings: Vec<String>,
}

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link; never followed.
    Symlink,
}

/// One entry in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Size in bytes for files.
    pub size: Option<u64>,
}

/// Browsable directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// Normalised directory path.
    pub path: String,
    /// Parent directory, absent at the root.
    pub parent: Option<String>,
    /// Namespace the listing came from.
    pub source: ListingSource,
    /// Directories first, then files, case-insensitive by name.
    pub entries: Vec<DirectoryEntry>,
}

/// Remote client version probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Application version string (e.g. `v5.0.1`).
    pub app_version: String,
    /// Web API version string.
    pub api_version: String,
    /// Whether the torrent creator endpoints are available.
    pub creator_supported: bool,
}

/// Progress report emitted while a task is polled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Remote task identifier.
    pub task_id: String,
    /// Current phase.
    pub phase: TaskPhase,
    /// Progress, 0..=100.
    pub percent: f64,
    /// File currently being processed, when the remote reports it.
    pub current_file: Option<String>,
    /// Estimated seconds remaining.
    pub eta_seconds: Option<u64>,
}

/// Lifecycle of a background creation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Validating and assembling the request.
    Building,
    /// Accepted by the remote client.
    Submitted,
    /// Waiting for the remote task.
    Polling,
    /// Artifact available.
    Finished,
    /// Ended with an error.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

impl JobState {
    /// True once the job no longer changes.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }

    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Serializable summary of a creation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Error classification.
    pub kind: ErrorKind,
    /// Constant message for the kind.
    pub message: String,
    /// Context such as the offending path or remote text.
    pub detail: Option<String>,
}

impl From<&CreationError> for JobFailure {
    fn from(error: &CreationError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            detail: error.detail(),
        }
    }
}

/// Snapshot of a background creation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationJob {
    /// Job identifier.
    pub id: Uuid,
    /// Source path as requested.
    pub source_path: String,
    /// Lifecycle state.
    pub state: JobState,
    /// Remote task identifier once submitted.
    pub task_id: Option<String>,
    /// Last reported progress.
    pub progress_percent: f64,
    /// Last reported phase.
    pub phase: Option<TaskPhase>,
    /// Estimated seconds remaining.
    pub eta_seconds: Option<u64>,
    /// Suggested artifact file name once finished.
    pub artifact_name: Option<String>,
    /// Info hash once finished.
    pub info_hash: Option<String>,
    /// Whether the torrent was added for seeding.
    pub seeded: bool,
    /// Non-fatal issues.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Failure details when the job failed or was cancelled.
    pub error: Option<JobFailure>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl CreationJob {
    /// Fresh job in the building state.
    #[must_use]
    pub fn new(id: Uuid, source_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            source_path: source_path.into(),
            state: JobState::Building,
            task_id: None,
            progress_percent: 0.0,
            phase: None,
            eta_seconds: None,
            artifact_name: None,
            info_hash: None,
            seeded: false,
            warnings: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_drops_share_ratio_without_seeding() {
        let mut request = CreationRequest::new("/data/a");
        request.ignore_share_ratio = true;
        request.web_seeds = vec![
            "https://a".into(),
            " https://b ".into(),
            "https://a".into(),
            String::new(),
        ];
        let normalized = request.normalized();
        assert!(!normalized.ignore_share_ratio);
        assert_eq!(normalized.web_seeds, vec!["https://a", "https://b"]);
    }

    #[test]
    fn normalized_keeps_share_ratio_when_seeding() {
        let mut request = CreationRequest::new("/data/a");
        request.start_seeding = true;
        request.ignore_share_ratio = true;
        assert!(request.normalized().ignore_share_ratio);
    }

    #[test]
    fn phase_follows_status_and_progress() {
        assert_eq!(
            TaskPhase::from_status(TaskStatus::Queued, 0.0),
            TaskPhase::Scanning
        );
        assert_eq!(
            TaskPhase::from_status(TaskStatus::Running, 42.0),
            TaskPhase::Hashing
        );
        assert_eq!(
            TaskPhase::from_status(TaskStatus::Running, 100.0),
            TaskPhase::Finalizing
        );
        assert_eq!(
            TaskPhase::from_status(TaskStatus::Finished, 100.0),
            TaskPhase::Done
        );
        assert_eq!(
            TaskPhase::from_status(TaskStatus::Failed, 10.0),
            TaskPhase::Error
        );
    }

    #[test]
    fn minimal_params_keep_only_path_and_format() {
        let mut request = CreationRequest::new("/host/a");
        request.comment = "hello".into();
        request.announce_tiers = vec![vec!["udp://t".into()]];
        let full = CreationParams::full(&request, "/data/a", Some(65_536));
        assert!(!full.is_minimal());
        assert_eq!(full.comment.as_deref(), Some("hello"));
        let minimal = CreationParams::minimal("/data/a", TorrentFormat::Hybrid);
        assert!(minimal.is_minimal());
        assert_eq!(minimal.format, TorrentFormat::Hybrid);
    }

    #[test]
    fn request_deserializes_with_defaults() -> anyhow::Result<()> {
        let request: CreationRequest =
            serde_json::from_str(r#"{"source_path":"/data/movie"}"#)?;
        assert_eq!(request.target_piece_count, DEFAULT_TARGET_PIECE_COUNT);
        assert_eq!(request.format, TorrentFormat::V1);
        assert_eq!(request.piece_size_mode, PieceSizeMode::Auto);
        assert_eq!(request.path_source, ListingSource::Local);
        Ok(())
    }

    #[test]
    fn format_labels_round_trip() {
        for format in [TorrentFormat::V1, TorrentFormat::V2, TorrentFormat::Hybrid] {
            assert_eq!(TorrentFormat::parse(format.as_str()), Some(format));
        }
        assert_eq!(TorrentFormat::parse("v3"), None);
    }
}

//! Capability traits implemented by adapters and consumed by the orchestrator.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{JobResult, ListingError, ListingResult, RemoteError, RemoteResult};
use crate::model::{
    ConnectionInfo, CreationJob, CreationParams, CreationRequest, CreationTask, DirectoryEntry,
    DirectoryListing, EntryKind, ListingSource, PathAnalysis, ProgressUpdate, SeedOptions,
    TorrentArtifact,
};

/// Remote torrent client able to build `.torrent` files.
#[async_trait]
pub trait RemoteTorrentClient: Send + Sync {
    /// Queue a creation task and return its identifier.
    async fn submit_creation_task(&self, params: &CreationParams) -> RemoteResult<String>;

    /// Current status of a task.
    async fn task_status(&self, task_id: &str) -> RemoteResult<CreationTask>;

    /// Download the metainfo produced by a finished task.
    async fn fetch_artifact(&self, task_id: &str) -> RemoteResult<Vec<u8>>;

    /// Remove a task from the remote queue.
    async fn delete_task(&self, task_id: &str) -> RemoteResult<()>;

    /// Add a metainfo payload to the client and start seeding it.
    async fn add_and_seed(&self, bytes: &[u8], options: &SeedOptions) -> RemoteResult<()>;

    /// Probe the remote version; default implementation reports lack of support.
    async fn connection_info(&self) -> RemoteResult<ConnectionInfo> {
        Err(RemoteError::Protocol {
            operation: "connection_info",
            status: None,
            detail: "version probe not supported by this client".to_string(),
        })
    }
}

/// Directory listing capability, local or remote.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Entries directly below `path`, in no particular order.
    async fn list_directory(&self, path: &str) -> ListingResult<Vec<DirectoryEntry>>;

    /// Describe a single path by listing its parent.
    async fn stat(&self, path: &str) -> ListingResult<DirectoryEntry> {
        let trimmed = path.trim_end_matches('/');
        let Some((parent, name)) = trimmed.rsplit_once('/') else {
            return Err(ListingError::NotFound {
                path: path.to_string(),
            });
        };
        if name.is_empty() {
            return Ok(DirectoryEntry {
                name: "/".to_string(),
                path: "/".to_string(),
                kind: EntryKind::Directory,
                size: None,
            });
        }
        let parent = if parent.is_empty() { "/" } else { parent };
        self.list_directory(parent)
            .await?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| ListingError::NotFound {
                path: path.to_string(),
            })
    }
}

/// Receives progress from a running orchestration.
pub trait CreationObserver: Send + Sync {
    /// The remote accepted the task; `used_fallback` is set for the minimal retry.
    fn submitted(&self, task_id: &str, used_fallback: bool);

    /// A poll reported new progress.
    fn progressed(&self, update: &ProgressUpdate);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CreationObserver for NoopObserver {
    fn submitted(&self, _task_id: &str, _used_fallback: bool) {}

    fn progressed(&self, _update: &ProgressUpdate) {}
}

/// Background creation jobs exposed to delivery surfaces.
#[async_trait]
pub trait CreationWorkflow: Send + Sync {
    /// Validate and start a creation job.
    async fn start(&self, request: CreationRequest) -> JobResult<Uuid>;

    /// Snapshot of a job.
    async fn job(&self, id: Uuid) -> JobResult<CreationJob>;

    /// Request cancellation and return the current snapshot.
    async fn cancel(&self, id: Uuid) -> JobResult<CreationJob>;

    /// Metainfo produced by a finished job.
    async fn artifact(&self, id: Uuid) -> JobResult<TorrentArtifact>;

    /// Snapshots of every tracked job, newest first.
    async fn list(&self) -> Vec<CreationJob>;
}

/// Scanning and browsing over both path namespaces.
#[async_trait]
pub trait PathInspector: Send + Sync {
    /// Analyze a path for size and file count.
    async fn scan(&self, path: &str, source: ListingSource) -> ListingResult<PathAnalysis>;

    /// List one directory for browsing.
    async fn browse(&self, path: &str, source: ListingSource) -> ListingResult<DirectoryListing>;

    /// Existing starting points for browsing.
    async fn roots(&self) -> Vec<String>;
}

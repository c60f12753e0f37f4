//! Scripted fakes for the remote creator and directory listers.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use seedforge_core::{
    ConnectionInfo, CreationParams, CreationTask, DirectoryEntry, DirectoryLister, EntryKind,
    ListingError, ListingResult, RemoteError, RemoteResult, RemoteTorrentClient, SeedOptions,
    TaskStatus,
};

/// Cloneable description of a remote failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Creator queue full.
    Busy,
    /// Remote cannot see the path.
    PathNotFound(String),
    /// Credentials rejected.
    Unauthorized,
    /// Parameters rejected.
    UnsupportedParameters(String),
    /// Task unknown.
    TaskNotFound(String),
    /// Remote unreachable.
    Connection,
    /// Unexpected response.
    Protocol(String),
}

impl ScriptedFailure {
    /// Materialise the failure as a [`RemoteError`].
    #[must_use]
    pub fn into_error(self) -> RemoteError {
        match self {
            Self::Busy => RemoteError::Busy,
            Self::PathNotFound(path) => RemoteError::PathNotFound { path },
            Self::Unauthorized => RemoteError::Unauthorized {
                reason: "bad_credentials",
            },
            Self::UnsupportedParameters(detail) => RemoteError::UnsupportedParameters { detail },
            Self::TaskNotFound(task_id) => RemoteError::TaskNotFound { task_id },
            Self::Connection => RemoteError::Connection {
                operation: "scripted",
                source: Box::new(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
            },
            Self::Protocol(detail) => RemoteError::Protocol {
                operation: "scripted",
                status: Some(500),
                detail,
            },
        }
    }
}

/// One scripted answer to `task_status`.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusStep {
    /// Report a status with progress.
    Report(TaskStatus, f64),
    /// Report `Failed` with the given message.
    Failed(String),
    /// Fail the poll itself.
    Error(ScriptedFailure),
}

impl StatusStep {
    fn into_result(self, task_id: &str) -> RemoteResult<CreationTask> {
        match self {
            Self::Report(status, progress) => {
                Ok(CreationTask::new(task_id, status, progress, None))
            }
            Self::Failed(message) => Ok(CreationTask::new(
                task_id,
                TaskStatus::Failed,
                0.0,
                Some(message),
            )),
            Self::Error(failure) => Err(failure.into_error()),
        }
    }
}

/// Call recorded by [`ScriptedRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    /// `submit_creation_task`.
    Submit(CreationParams),
    /// `task_status`.
    Status(String),
    /// `fetch_artifact`.
    Fetch(String),
    /// `delete_task`.
    Delete(String),
    /// `add_and_seed`.
    Seed(SeedOptions),
    /// `connection_info`.
    ConnectionInfo,
}

#[derive(Debug)]
struct Script {
    submits: VecDeque<Result<String, ScriptedFailure>>,
    statuses: VecDeque<StatusStep>,
    last_status: StatusStep,
    artifact: Result<Vec<u8>, ScriptedFailure>,
    delete: Option<ScriptedFailure>,
    seed: Option<ScriptedFailure>,
    connection: Result<ConnectionInfo, ScriptedFailure>,
    status_delay: Option<Duration>,
    calls: Vec<RemoteCall>,
}

/// Fake [`RemoteTorrentClient`] replaying scripted answers and recording every call.
///
/// Submissions default to `task-1`; once the status script runs out the last step repeats.
#[derive(Debug)]
pub struct ScriptedRemote {
    script: Mutex<Script>,
}

impl Default for ScriptedRemote {
    fn default() -> Self {
        Self::new()
    }
}

/// Bencoded metainfo used as the default artifact.
pub const SAMPLE_TORRENT: &[u8] =
    b"d8:announce16:udp://t/announce4:infod6:lengthi5e4:name5:movie12:piece lengthi16384e6:pieces0:ee";

impl ScriptedRemote {
    /// Fake that accepts one submission and finishes on the first poll.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                submits: VecDeque::new(),
                statuses: VecDeque::new(),
                last_status: StatusStep::Report(TaskStatus::Finished, 100.0),
                artifact: Ok(SAMPLE_TORRENT.to_vec()),
                delete: None,
                seed: None,
                connection: Ok(ConnectionInfo {
                    app_version: "v5.0.0".into(),
                    api_version: "2.11.2".into(),
                    creator_supported: true,
                }),
                status_delay: None,
                calls: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue submission answers in order.
    #[must_use]
    pub fn with_submits(
        self,
        answers: impl IntoIterator<Item = Result<String, ScriptedFailure>>,
    ) -> Self {
        self.lock().submits.extend(answers);
        self
    }

    /// Queue status answers in order.
    #[must_use]
    pub fn with_statuses(self, steps: impl IntoIterator<Item = StatusStep>) -> Self {
        {
            let mut script = self.lock();
            script.statuses.extend(steps);
            if let Some(last) = script.statuses.back().cloned() {
                script.last_status = last;
            }
        }
        self
    }

    /// Replace the artifact answer.
    #[must_use]
    pub fn with_artifact(self, artifact: Result<Vec<u8>, ScriptedFailure>) -> Self {
        self.lock().artifact = artifact;
        self
    }

    /// Make `delete_task` fail.
    #[must_use]
    pub fn failing_delete(self, failure: ScriptedFailure) -> Self {
        self.lock().delete = Some(failure);
        self
    }

    /// Make `add_and_seed` fail.
    #[must_use]
    pub fn failing_seed(self, failure: ScriptedFailure) -> Self {
        self.lock().seed = Some(failure);
        self
    }

    /// Replace the connection probe answer.
    #[must_use]
    pub fn with_connection(self, answer: Result<ConnectionInfo, ScriptedFailure>) -> Self {
        self.lock().connection = answer;
        self
    }

    /// Sleep before answering each status poll.
    #[must_use]
    pub fn with_status_delay(self, delay: Duration) -> Self {
        self.lock().status_delay = Some(delay);
        self
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Parameters of each submission.
    #[must_use]
    pub fn submitted(&self) -> Vec<CreationParams> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Submit(params) => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of status polls.
    #[must_use]
    pub fn status_polls(&self) -> usize {
        self.count(|call| matches!(call, RemoteCall::Status(_)))
    }

    /// Number of deletions attempted.
    #[must_use]
    pub fn deletions(&self) -> usize {
        self.count(|call| matches!(call, RemoteCall::Delete(_)))
    }

    /// Seeding options passed to `add_and_seed`.
    #[must_use]
    pub fn seeded(&self) -> Vec<SeedOptions> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Seed(options) => Some(options.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&RemoteCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }
}

#[async_trait]
impl RemoteTorrentClient for ScriptedRemote {
    async fn submit_creation_task(&self, params: &CreationParams) -> RemoteResult<String> {
        let mut script = self.lock();
        script.calls.push(RemoteCall::Submit(params.clone()));
        match script.submits.pop_front() {
            Some(answer) => answer.map_err(ScriptedFailure::into_error),
            None => Ok("task-1".to_string()),
        }
    }

    async fn task_status(&self, task_id: &str) -> RemoteResult<CreationTask> {
        let (step, delay) = {
            let mut script = self.lock();
            script.calls.push(RemoteCall::Status(task_id.to_string()));
            let step = script
                .statuses
                .pop_front()
                .unwrap_or_else(|| script.last_status.clone());
            (step, script.status_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        step.into_result(task_id)
    }

    async fn fetch_artifact(&self, task_id: &str) -> RemoteResult<Vec<u8>> {
        let mut script = self.lock();
        script.calls.push(RemoteCall::Fetch(task_id.to_string()));
        script.artifact.clone().map_err(ScriptedFailure::into_error)
    }

    async fn delete_task(&self, task_id: &str) -> RemoteResult<()> {
        let mut script = self.lock();
        script.calls.push(RemoteCall::Delete(task_id.to_string()));
        script
            .delete
            .clone()
            .map_or(Ok(()), |failure| Err(failure.into_error()))
    }

    async fn add_and_seed(&self, _bytes: &[u8], options: &SeedOptions) -> RemoteResult<()> {
        let mut script = self.lock();
        script.calls.push(RemoteCall::Seed(options.clone()));
        script
            .seed
            .clone()
            .map_or(Ok(()), |failure| Err(failure.into_error()))
    }

    async fn connection_info(&self) -> RemoteResult<ConnectionInfo> {
        let mut script = self.lock();
        script.calls.push(RemoteCall::ConnectionInfo);
        script.connection.clone().map_err(ScriptedFailure::into_error)
    }
}

/// In-memory [`DirectoryLister`] built from file and directory declarations.
#[derive(Debug, Default)]
pub struct MemoryLister {
    children: BTreeMap<String, Vec<DirectoryEntry>>,
    denied: HashSet<String>,
}

fn split_parent(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) => (
            if parent.is_empty() { "/" } else { parent }.to_string(),
            name.to_string(),
        ),
        None => ("/".to_string(), trimmed.to_string()),
    }
}

impl MemoryLister {
    /// Empty tree containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        let mut lister = Self::default();
        lister.children.insert("/".to_string(), Vec::new());
        lister
    }

    fn insert(&mut self, path: &str, kind: EntryKind, size: Option<u64>) {
        let (parent, name) = split_parent(path);
        if !self.children.contains_key(&parent) && parent != "/" {
            self.insert(&parent, EntryKind::Directory, None);
        }
        let siblings = self.children.entry(parent).or_default();
        if siblings.iter().any(|entry| entry.name == name) {
            return;
        }
        siblings.push(DirectoryEntry {
            name,
            path: path.trim_end_matches('/').to_string(),
            kind,
            size,
        });
        if kind == EntryKind::Directory {
            self.children
                .entry(path.trim_end_matches('/').to_string())
                .or_default();
        }
    }

    /// Add a directory (parents are created as needed).
    #[must_use]
    pub fn dir(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::Directory, None);
        self
    }

    /// Add a file of `size` bytes.
    #[must_use]
    pub fn file(mut self, path: &str, size: u64) -> Self {
        self.insert(path, EntryKind::File, Some(size));
        self
    }

    /// Add a symlink entry.
    #[must_use]
    pub fn symlink(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::Symlink, None);
        self
    }

    /// Make listing `path` fail with permission denied.
    #[must_use]
    pub fn deny(mut self, path: &str) -> Self {
        self.denied.insert(path.to_string());
        self
    }
}

#[async_trait]
impl DirectoryLister for MemoryLister {
    async fn list_directory(&self, path: &str) -> ListingResult<Vec<DirectoryEntry>> {
        let key = if path == "/" {
            "/".to_string()
        } else {
            path.trim_end_matches('/').to_string()
        };
        if self.denied.contains(&key) {
            return Err(ListingError::PermissionDenied { path: key });
        }
        self.children
            .get(&key)
            .cloned()
            .ok_or(ListingError::NotFound { path: key })
    }
}

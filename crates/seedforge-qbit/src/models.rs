//! Wire shapes returned by the WebUI API.

use seedforge_core::{CreationTask, DirectoryEntry, EntryKind, TaskStatus};
use serde::Deserialize;

use crate::error::{QbitError, QbitResult};

/// `torrentcreator/addTask` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AddTaskResponse {
    /// Assigned task identifier.
    #[serde(rename = "taskID")]
    pub task_id: String,
}

/// One element of the `torrentcreator/status` array.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatorTaskStatus {
    /// Task identifier.
    #[serde(rename = "taskID")]
    pub task_id: String,
    /// `Queued`, `Running`, `Finished` or `Failed`.
    pub status: String,
    /// Hashing progress in percent.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Failure text for failed tasks.
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

impl CreatorTaskStatus {
    /// Convert into the domain snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::Decode`] for unknown status strings.
    pub fn into_task(self) -> QbitResult<CreationTask> {
        let status = match self.status.as_str() {
            "Queued" => TaskStatus::Queued,
            "Running" => TaskStatus::Running,
            "Finished" => TaskStatus::Finished,
            "Failed" => TaskStatus::Failed,
            other => {
                return Err(QbitError::Decode {
                    operation: "creator.status",
                    detail: format!("unknown task status `{other}`"),
                });
            }
        };
        let progress = match status {
            TaskStatus::Finished => 100.0,
            _ => self.progress.unwrap_or(0.0),
        };
        let error_message = self.error_message.filter(|message| !message.is_empty());
        Ok(CreationTask::new(self.task_id, status, progress, error_message))
    }
}

/// One element of `app/getDirectoryContent` with metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDirectoryItem {
    /// Entry name.
    pub name: String,
    /// `file` or `dir`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Size in bytes for files.
    #[serde(default)]
    pub size: Option<u64>,
}

impl RemoteDirectoryItem {
    /// Convert into a directory entry rooted at `parent`.
    #[must_use]
    pub fn into_entry(self, parent: &str) -> DirectoryEntry {
        let path = if parent.ends_with('/') {
            format!("{parent}{}", self.name)
        } else {
            format!("{parent}/{}", self.name)
        };
        let kind = match self.kind.as_str() {
            "dir" | "directory" => EntryKind::Directory,
            "symlink" => EntryKind::Symlink,
            _ => EntryKind::File,
        };
        let size = if kind == EntryKind::File { self.size } else { None };
        DirectoryEntry {
            name: self.name,
            path,
            kind,
            size,
        }
    }
}

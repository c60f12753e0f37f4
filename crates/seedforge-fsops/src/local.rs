//! Local filesystem implementation of [`DirectoryLister`].

use std::io;
use std::path::Path;

use async_trait::async_trait;
use seedforge_core::{DirectoryEntry, DirectoryLister, EntryKind, ListingError, ListingResult};
use tracing::warn;

use crate::browse::join_path;

/// Lists the host filesystem with `tokio::fs`. Symlinks are reported, never followed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalLister;

impl LocalLister {
    /// Construct a lister.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn map_io(operation: &'static str, path: &str, source: io::Error) -> ListingError {
    match source.kind() {
        io::ErrorKind::NotFound => ListingError::NotFound {
            path: path.to_string(),
        },
        io::ErrorKind::PermissionDenied => ListingError::PermissionDenied {
            path: path.to_string(),
        },
        io::ErrorKind::NotADirectory => ListingError::NotADirectory {
            path: path.to_string(),
        },
        _ => ListingError::Unavailable {
            operation,
            path: path.to_string(),
            source: Box::new(source),
        },
    }
}

#[async_trait]
impl DirectoryLister for LocalLister {
    async fn list_directory(&self, path: &str) -> ListingResult<Vec<DirectoryEntry>> {
        let mut reader = tokio::fs::read_dir(path)
            .await
            .map_err(|err| map_io("fs.read_dir", path, err))?;
        let mut entries = Vec::new();
        while let Some(item) = reader
            .next_entry()
            .await
            .map_err(|err| map_io("fs.next_entry", path, err))?
        {
            // names that are not UTF-8 cannot be addressed through string paths
            let Ok(name) = item.file_name().into_string() else {
                warn!(
                    directory = path,
                    entry = %item.path().display(),
                    "skipping entry with a non UTF-8 name"
                );
                continue;
            };
            let full_path = join_path(path, &name);
            let file_type = item
                .file_type()
                .await
                .map_err(|err| map_io("fs.file_type", &full_path, err))?;
            let (kind, size) = if file_type.is_symlink() {
                (EntryKind::Symlink, None)
            } else if file_type.is_dir() {
                (EntryKind::Directory, None)
            } else {
                let meta = item
                    .metadata()
                    .await
                    .map_err(|err| map_io("fs.metadata", &full_path, err))?;
                (EntryKind::File, Some(meta.len()))
            };
            entries.push(DirectoryEntry {
                name,
                path: full_path,
                kind,
                size,
            });
        }
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> ListingResult<DirectoryEntry> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|err| map_io("fs.metadata", path, err))?;
        let name = Path::new(path)
            .file_name()
            .map_or_else(|| "/".to_string(), |name| name.to_string_lossy().into_owned());
        let (kind, size) = if meta.is_dir() {
            (EntryKind::Directory, None)
        } else {
            (EntryKind::File, Some(meta.len()))
        };
        Ok(DirectoryEntry {
            name,
            path: path.to_string(),
            kind,
            size,
        })
    }
}

//! Path analyzer: total size and file count for a source path.

use seedforge_core::{ContentMode, DirectoryLister, EntryKind, PathAnalysis};
use tracing::debug;

use crate::browse::normalize_path;
use crate::error::{FsOpsError, FsOpsResult};
use crate::util::format_file_size;

/// Content above this size produces a warning.
pub const LARGE_CONTENT_BYTES: u64 = 10 * 1024 * 1024 * 1024;
/// Default entries considered per directory.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
/// Default recursion bound.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Walks a tree through a [`DirectoryLister`] and accumulates totals.
///
/// Each directory contributes at most `max_entries_per_directory` entries, taken in
/// name order so repeated scans agree. Symlinks are skipped with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathAnalyzer {
    max_entries_per_directory: usize,
    max_depth: usize,
}

impl Default for PathAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_DEPTH)
    }
}

impl PathAnalyzer {
    /// Analyzer with explicit bounds (each at least one).
    #[must_use]
    pub fn new(max_entries_per_directory: usize, max_depth: usize) -> Self {
        Self {
            max_entries_per_directory: max_entries_per_directory.max(1),
            max_depth: max_depth.max(1),
        }
    }

    /// Analyze `path`. Partial results are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] for relative paths, and
    /// [`FsOpsError::NotFound`] or [`FsOpsError::PermissionDenied`] when any part of the
    /// tree cannot be read.
    pub async fn analyze(
        &self,
        path: &str,
        lister: &dyn DirectoryLister,
    ) -> FsOpsResult<PathAnalysis> {
        if !path.trim().starts_with('/') {
            return Err(FsOpsError::InvalidInput {
                field: "path",
                reason: "must_be_absolute",
                value: Some(path.to_string()),
            });
        }
        let root = normalize_path(path);
        let entry = lister
            .stat(&root)
            .await
            .map_err(|source| FsOpsError::listing("scan.stat", &root, source))?;

        let mut analysis = PathAnalysis {
            path: root.clone(),
            exists: true,
            mode: ContentMode::File,
            total_bytes: 0,
            file_count: 0,
            folder_count: 0,
            truncated: false,
            warnings: Vec::new(),
        };

        match entry.kind {
            EntryKind::File => {
                analysis.total_bytes = entry.size.unwrap_or(0);
                analysis.file_count = 1;
            }
            EntryKind::Symlink => {
                analysis.warnings.push(format!("symlink skipped: {root}"));
            }
            EntryKind::Directory => {
                analysis.mode = ContentMode::Folder;
                self.walk(&root, lister, &mut analysis).await?;
                if analysis.file_count == 0 {
                    analysis.warnings.push("folder is empty".to_string());
                }
            }
        }

        if analysis.total_bytes > LARGE_CONTENT_BYTES {
            analysis.warnings.push(format!(
                "content is large ({}); hashing may take a while",
                format_file_size(analysis.total_bytes)
            ));
        }
        if analysis.truncated {
            analysis.warnings.push(format!(
                "listing truncated to {} entries per directory",
                self.max_entries_per_directory
            ));
        }

        debug!(
            path = %analysis.path,
            total_bytes = analysis.total_bytes,
            file_count = analysis.file_count,
            folder_count = analysis.folder_count,
            truncated = analysis.truncated,
            "path analyzed"
        );
        Ok(analysis)
    }

    async fn walk(
        &self,
        root: &str,
        lister: &dyn DirectoryLister,
        analysis: &mut PathAnalysis,
    ) -> FsOpsResult<()> {
        let mut pending = vec![(root.to_string(), 0_usize)];
        let mut depth_warned = false;
        while let Some((directory, depth)) = pending.pop() {
            let mut entries = lister
                .list_directory(&directory)
                .await
                .map_err(|source| FsOpsError::listing("scan.list", &directory, source))?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            if entries.len() > self.max_entries_per_directory {
                analysis.truncated = true;
                entries.truncate(self.max_entries_per_directory);
            }

            let mut subdirectories = Vec::new();
            for entry in entries {
                match entry.kind {
                    EntryKind::File => {
                        analysis.total_bytes =
                            analysis.total_bytes.saturating_add(entry.size.unwrap_or(0));
                        analysis.file_count += 1;
                    }
                    EntryKind::Directory => {
                        analysis.folder_count += 1;
                        if depth + 1 < self.max_depth {
                            subdirectories.push((entry.path, depth + 1));
                        } else if !depth_warned {
                            depth_warned = true;
                            analysis.truncated = true;
                            analysis.warnings.push(format!(
                                "maximum depth {} reached below {}",
                                self.max_depth, directory
                            ));
                        }
                    }
                    EntryKind::Symlink => {
                        analysis
                            .warnings
                            .push(format!("symlink skipped: {}", entry.path));
                    }
                }
            }
            pending.extend(subdirectories.into_iter().rev());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalLister;
    use seedforge_test_support::MemoryLister;
    use std::fs;
    use tempfile::TempDir;

    fn root_of(temp: &TempDir) -> String {
        temp.path().to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn sums_nested_tree() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir_all(temp.path().join("a/b"))?;
        fs::write(temp.path().join("top.bin"), vec![0_u8; 10])?;
        fs::write(temp.path().join("a/mid.bin"), vec![0_u8; 20])?;
        fs::write(temp.path().join("a/b/deep.bin"), vec![0_u8; 30])?;

        let analysis = PathAnalyzer::default()
            .analyze(&root_of(&temp), &LocalLister::new())
            .await?;
        assert_eq!(analysis.mode, ContentMode::Folder);
        assert_eq!(analysis.total_bytes, 60);
        assert_eq!(analysis.file_count, 3);
        assert_eq!(analysis.folder_count, 2);
        assert!(!analysis.truncated);
        assert!(analysis.warnings.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn single_file_counts_once() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("movie.mkv");
        fs::write(&file, vec![1_u8; 4096])?;
        let analysis = PathAnalyzer::default()
            .analyze(&file.to_string_lossy(), &LocalLister::new())
            .await?;
        assert_eq!(analysis.mode, ContentMode::File);
        assert_eq!(analysis.file_count, 1);
        assert_eq!(analysis.total_bytes, 4096);
        Ok(())
    }

    #[tokio::test]
    async fn empty_folder_warns() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let analysis = PathAnalyzer::default()
            .analyze(&root_of(&temp), &LocalLister::new())
            .await?;
        assert_eq!(analysis.file_count, 0);
        assert!(analysis.warnings.iter().any(|w| w == "folder is empty"));
        Ok(())
    }

    #[tokio::test]
    async fn per_directory_cap_takes_first_names() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        for (name, size) in [("c.bin", 300), ("a.bin", 100), ("b.bin", 200)] {
            fs::write(temp.path().join(name), vec![0_u8; size])?;
        }
        let analysis = PathAnalyzer::new(2, 64)
            .analyze(&root_of(&temp), &LocalLister::new())
            .await?;
        assert!(analysis.truncated);
        assert_eq!(analysis.file_count, 2);
        assert_eq!(analysis.total_bytes, 300);
        Ok(())
    }

    #[tokio::test]
    async fn depth_bound_stops_recursion() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir_all(temp.path().join("l1/l2"))?;
        fs::write(temp.path().join("l1/l2/deep.bin"), vec![0_u8; 5])?;
        fs::write(temp.path().join("l1/shallow.bin"), vec![0_u8; 7])?;
        let analysis = PathAnalyzer::new(1000, 2)
            .analyze(&root_of(&temp), &LocalLister::new())
            .await?;
        assert_eq!(analysis.total_bytes, 7);
        assert!(analysis.truncated);
        Ok(())
    }

    #[tokio::test]
    async fn missing_and_relative_paths_fail() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let missing = temp.path().join("gone").to_string_lossy().into_owned();
        let result = PathAnalyzer::default()
            .analyze(&missing, &LocalLister::new())
            .await;
        assert!(matches!(result, Err(FsOpsError::NotFound { .. })));
        let relative = PathAnalyzer::default()
            .analyze("relative/path", &LocalLister::new())
            .await;
        assert!(matches!(relative, Err(FsOpsError::InvalidInput { .. })));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_skipped_with_warning() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("real.bin"), vec![0_u8; 9])?;
        std::os::unix::fs::symlink(temp.path().join("real.bin"), temp.path().join("alias.bin"))?;
        let analysis = PathAnalyzer::default()
            .analyze(&root_of(&temp), &LocalLister::new())
            .await?;
        assert_eq!(analysis.file_count, 1);
        assert_eq!(analysis.total_bytes, 9);
        assert!(analysis.warnings.iter().any(|w| w.starts_with("symlink skipped")));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_subdirectory_fails_the_whole_scan() {
        let lister = MemoryLister::new()
            .file("/data/show/s01/e01.mkv", 100)
            .file("/data/show/s02/e01.mkv", 200)
            .deny("/data/show/s02");

        let result = PathAnalyzer::default().analyze("/data/show", &lister).await;

        assert!(matches!(
            result,
            Err(FsOpsError::PermissionDenied { path }) if path == "/data/show/s02"
        ));
    }

    #[tokio::test]
    async fn repeated_scans_agree() -> anyhow::Result<()> {
        let lister = MemoryLister::new()
            .file("/data/show/s02/e01.mkv", 200)
            .file("/data/show/s01/e02.mkv", 150)
            .file("/data/show/s01/e01.mkv", 100)
            .file("/data/show/cover.jpg", 7)
            .symlink("/data/show/latest");
        let analyzer = PathAnalyzer::new(3, 64);

        let first = analyzer.analyze("/data/show", &lister).await?;
        let second = analyzer.analyze("/data/show", &lister).await?;

        assert_eq!(first, second);
        assert!(first.truncated);
        assert_eq!(first.file_count, 3);
        assert_eq!(first.total_bytes, 257);
        Ok(())
    }
}

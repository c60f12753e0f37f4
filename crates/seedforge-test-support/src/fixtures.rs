//! Filesystem fixtures backed by temporary directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory tree removed on drop.
#[derive(Debug)]
pub struct TempTree {
    dir: TempDir,
}

impl TempTree {
    /// Create an empty tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Create a tree holding `files` (relative path, size in bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, usize)>) -> io::Result<Self> {
        let tree = Self::new()?;
        for (relative, size) in files {
            tree.write(relative, size)?;
        }
        Ok(tree)
    }

    /// Write a zero-filled file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, relative: &str, size: usize) -> io::Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, vec![0_u8; size])?;
        Ok(path)
    }

    /// Create an empty directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn mkdir(&self, relative: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Root of the tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Root of the tree as a string.
    #[must_use]
    pub fn root(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Absolute string path of `relative`.
    #[must_use]
    pub fn child(&self, relative: &str) -> String {
        self.dir.path().join(relative).to_string_lossy().into_owned()
    }
}

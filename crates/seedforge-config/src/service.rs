//! Settings holder with atomic reload and a file watcher.
//!
//! # Design
//! - The current settings live in a `watch` channel as `Arc<Settings>`; readers never
//!   observe a partially applied reload.
//! - `reload` validates before swapping; a failed reload leaves the old value in place.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::error::ConfigResult;
use crate::loader::{load_settings, process_env};
use crate::model::Settings;

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

struct ConfigInner {
    path: Option<PathBuf>,
    lookup: Box<EnvLookup>,
    sender: watch::Sender<Arc<Settings>>,
}

/// Shared handle to the live configuration.
#[derive(Clone)]
pub struct ConfigService {
    inner: Arc<ConfigInner>,
}

impl fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigService")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl ConfigService {
    /// Load settings from `path` using the process environment.
    ///
    /// # Errors
    ///
    /// Returns IO, expansion, parse or validation errors.
    pub async fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        Self::load_with(path, process_env).await
    }

    /// Load settings from `path` resolving variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns IO, expansion, parse or validation errors.
    pub async fn load_with<F>(path: impl Into<PathBuf>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let path = path.into();
        let settings = load_settings(&path, &lookup).await?;
        info!(path = %path.display(), "configuration loaded");
        let (sender, _) = watch::channel(Arc::new(settings));
        Ok(Self {
            inner: Arc::new(ConfigInner {
                path: Some(path),
                lookup: Box::new(lookup),
                sender,
            }),
        })
    }

    /// Wrap already-built settings; `reload` becomes a no-op.
    #[must_use]
    pub fn from_settings(settings: Settings) -> Self {
        let (sender, _) = watch::channel(Arc::new(settings));
        Self {
            inner: Arc::new(ConfigInner {
                path: None,
                lookup: Box::new(process_env),
                sender,
            }),
        }
    }

    /// Backing file, when loaded from disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Current settings.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Settings> {
        self.inner.sender.borrow().clone()
    }

    /// Receiver notified on every successful reload.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.inner.sender.subscribe()
    }

    /// Re-read the backing file and swap the settings when valid.
    ///
    /// # Errors
    ///
    /// Returns the load error; the previous settings stay active.
    pub async fn reload(&self) -> ConfigResult<Arc<Settings>> {
        let Some(path) = self.inner.path.as_deref() else {
            return Ok(self.snapshot());
        };
        let settings = Arc::new(load_settings(path, &*self.inner.lookup).await?);
        self.inner.sender.send_replace(Arc::clone(&settings));
        info!(path = %path.display(), "configuration reloaded");
        Ok(settings)
    }

    /// Watch the backing file's modification time, polling every `interval`.
    pub async fn watch(&self, interval: Duration) -> ConfigWatcher {
        let last_modified = match self.path() {
            Some(path) => modified_time(path).await,
            None => None,
        };
        ConfigWatcher {
            service: self.clone(),
            interval,
            last_modified,
        }
    }
}

/// Polls the configuration file and reloads it when it changes.
pub struct ConfigWatcher {
    service: ConfigService,
    interval: Duration,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Wait for the next change and reload.
    ///
    /// # Errors
    ///
    /// Returns the reload error for a change that failed validation. The change is
    /// still consumed so the watcher does not retry the same broken file.
    pub async fn next(&mut self) -> ConfigResult<Arc<Settings>> {
        loop {
            sleep(self.interval).await;
            let Some(path) = self.service.path() else {
                continue;
            };
            let modified = modified_time(path).await;
            if modified != self.last_modified {
                self.last_modified = modified;
                return self.service.reload().await;
            }
        }
    }
}

async fn modified_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|meta| meta.modified().ok())
}

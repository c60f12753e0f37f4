//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers deserialized from YAML; every section has defaults.
//! - Derived values (base URL, mapper, durations) are computed here, not stored.

use std::fmt;
use std::time::Duration;

use seedforge_core::{
    CreationRequest, PathMapper, PathMapping, PieceSizeMode, TorrentFormat,
    DEFAULT_TARGET_PIECE_COUNT,
};
use serde::{Deserialize, Serialize};

use crate::defaults::{
    CONNECTION_TIMEOUT_SECS, CREATION_TIMEOUT_SECS, LOG_LEVEL, MAX_DEPTH,
    MAX_ENTRIES_PER_DIRECTORY, POLL_INTERVAL_SECS, QBIT_HOST, QBIT_PORT, QBIT_USERNAME,
    READ_TIMEOUT_SECS, WEB_HOST, WEB_PORT,
};
use crate::error::{ConfigError, ConfigResult};

/// Complete application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remote client connection.
    pub qbittorrent: QbittorrentConfig,
    /// Defaults applied to creation requests.
    pub torrent_creation: CreationDefaults,
    /// Path analyzer bounds.
    pub scanning: ScanningConfig,
    /// HTTP listener.
    pub web_server: WebServerConfig,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Connection details for the qBittorrent `WebUI`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QbittorrentConfig {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Use HTTPS.
    pub use_https: bool,
    /// Path prefix when served behind a reverse proxy.
    pub base_path: String,
    /// `WebUI` user.
    pub username: String,
    /// `WebUI` password.
    pub password: String,
    /// Verify TLS certificates.
    pub verify_tls: bool,
    /// Connect timeout in seconds.
    pub connection_timeout_secs: u64,
    /// Per-request timeout in seconds.
    pub read_timeout_secs: u64,
    /// Category applied to seeded torrents.
    pub category: Option<String>,
    /// Tags applied to seeded torrents.
    pub tags: Vec<String>,
    /// Default save path of the remote client, offered as a browse root.
    pub save_path: Option<String>,
    /// Host to remote path prefixes.
    pub path_mappings: Vec<PathMapping>,
}

impl Default for QbittorrentConfig {
    fn default() -> Self {
        Self {
            host: QBIT_HOST.to_string(),
            port: QBIT_PORT,
            use_https: false,
            base_path: String::new(),
            username: QBIT_USERNAME.to_string(),
            password: String::new(),
            verify_tls: true,
            connection_timeout_secs: CONNECTION_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            category: None,
            tags: Vec::new(),
            save_path: None,
            path_mappings: Vec::new(),
        }
    }
}

impl fmt::Debug for QbittorrentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QbittorrentConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_https", &self.use_https)
            .field("base_path", &self.base_path)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("category", &self.category)
            .field("tags", &self.tags)
            .field("save_path", &self.save_path)
            .field("path_mappings", &self.path_mappings)
            .finish()
    }
}

impl QbittorrentConfig {
    /// Root URL of the `WebUI`, without the `/api/v2` suffix.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        let base_path = self.base_path.trim_matches('/');
        if base_path.is_empty() {
            format!("{scheme}://{}:{}", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}/{base_path}", self.host, self.port)
        }
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Build the path mapper for the configured table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Mapping`] when prefixes are blank, relative or duplicated.
    pub fn path_mapper(&self) -> ConfigResult<PathMapper> {
        PathMapper::new(self.path_mappings.iter().cloned())
            .map_err(|source| ConfigError::Mapping { source })
    }
}

/// Defaults for fields omitted from creation requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationDefaults {
    /// Metainfo layout.
    pub format: TorrentFormat,
    /// Private flag.
    pub private: bool,
    /// Seed after creation.
    pub start_seeding: bool,
    /// Disable share limits when seeding.
    pub ignore_share_ratio: bool,
    /// Piece count the auto sizing aims for.
    pub target_piece_count: u64,
    /// Fixed piece size; `None` selects automatic sizing.
    pub piece_size: Option<u64>,
    /// Align files to piece boundaries.
    pub optimize_alignment: bool,
    /// Padding threshold when aligning.
    pub padded_file_size_limit: Option<u64>,
    /// Tracker tiers.
    pub trackers: Vec<Vec<String>>,
    /// Web seeds.
    pub url_seeds: Vec<String>,
    /// Comment.
    pub comment: String,
    /// Source tag.
    pub source: String,
    /// Seconds between status polls.
    pub poll_interval_secs: u64,
    /// Maximum seconds to wait for a task.
    pub timeout_secs: u64,
}

impl Default for CreationDefaults {
    fn default() -> Self {
        Self {
            format: TorrentFormat::V1,
            private: false,
            start_seeding: false,
            ignore_share_ratio: false,
            target_piece_count: DEFAULT_TARGET_PIECE_COUNT,
            piece_size: None,
            optimize_alignment: false,
            padded_file_size_limit: None,
            trackers: Vec::new(),
            url_seeds: Vec::new(),
            comment: String::new(),
            source: String::new(),
            poll_interval_secs: POLL_INTERVAL_SECS,
            timeout_secs: CREATION_TIMEOUT_SECS,
        }
    }
}

impl CreationDefaults {
    /// Poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Maximum wait.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// A request for `source_path` pre-filled from these defaults.
    #[must_use]
    pub fn request_for(&self, source_path: impl Into<String>) -> CreationRequest {
        let mut request = CreationRequest::new(source_path);
        request.format = self.format;
        request.is_private = self.private;
        request.start_seeding = self.start_seeding;
        request.ignore_share_ratio = self.ignore_share_ratio;
        request.target_piece_count = self.target_piece_count;
        if let Some(size) = self.piece_size {
            request.piece_size_mode = PieceSizeMode::Manual;
            request.piece_size_bytes = Some(size);
        }
        request.optimize_alignment = self.optimize_alignment;
        request.alignment_threshold_bytes = self.padded_file_size_limit;
        request.announce_tiers.clone_from(&self.trackers);
        request.web_seeds.clone_from(&self.url_seeds);
        request.comment.clone_from(&self.comment);
        request.source.clone_from(&self.source);
        request
    }
}

/// Path analyzer bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Entries considered per directory, in name order.
    pub max_entries_per_directory: usize,
    /// Maximum recursion depth.
    pub max_depth: usize,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            max_entries_per_directory: MAX_ENTRIES_PER_DIRECTORY,
            max_depth: MAX_DEPTH,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            host: WEB_HOST.to_string(),
            port: WEB_PORT,
        }
    }
}

impl WebServerConfig {
    /// `host:port` string suitable for socket address parsing.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level or `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

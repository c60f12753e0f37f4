//! Default values for configuration fields.
//!
//! # Design
//! - Centralize defaults so serde, docs and validation agree.

pub(crate) const DEFAULT_CONFIG_PATH: &str = "config/seedforge.yaml";
pub(crate) const QBIT_HOST: &str = "localhost";
pub(crate) const QBIT_PORT: u16 = 8080;
pub(crate) const QBIT_USERNAME: &str = "admin";
pub(crate) const CONNECTION_TIMEOUT_SECS: u64 = 10;
pub(crate) const READ_TIMEOUT_SECS: u64 = 30;
pub(crate) const POLL_INTERVAL_SECS: u64 = 2;
pub(crate) const CREATION_TIMEOUT_SECS: u64 = 300;
pub(crate) const MAX_ENTRIES_PER_DIRECTORY: usize = 1000;
pub(crate) const MAX_DEPTH: usize = 64;
pub(crate) const WEB_HOST: &str = "0.0.0.0";
pub(crate) const WEB_PORT: u16 = 8094;
pub(crate) const LOG_LEVEL: &str = "info";

#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! File-backed configuration with environment expansion and live reload.
//!
//! Layout: `model.rs` (typed sections), `loader.rs` (YAML, `${VAR}` expansion,
//! overrides), `validate.rs` (field rules, mapping diagnostics), `service.rs`
//! (`ConfigService` + `ConfigWatcher`).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    CONFIG_PATH_ENV, apply_env_overrides, config_path_from_env, expand_env, load_settings,
    parse_settings,
};
pub use model::{
    CreationDefaults, LoggingSettings, QbittorrentConfig, ScanningConfig, Settings,
    WebServerConfig,
};
pub use service::{ConfigService, ConfigWatcher};
pub use validate::{mapping_diagnostics, validate_settings};

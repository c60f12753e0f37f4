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

//! seedforge service wiring: configuration, the qBittorrent client, creation jobs and
//! the HTTP API.
//!
//! Layout: `bootstrap.rs` (service wiring), `orchestrator.rs` (single creation run),
//! `jobs.rs` (background job registry), `inspector.rs` (scan and browse), `error.rs`.

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level error type.
pub mod error;
/// Scanning and browsing in both namespaces.
pub mod inspector;
/// Background creation jobs and their event stream.
pub mod jobs;
/// Submit, poll, fetch, clean up and seed.
pub mod orchestrator;

pub use bootstrap::{qbit_client_config, run_app};
pub use error::{AppError, AppResult};
pub use inspector::PathInspectorService;
pub use jobs::JobRegistry;
pub use orchestrator::{CreationContext, CreationOrchestrator, PollPolicy, SeedingDefaults};

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

//! HTTP API for scanning, sizing, path mapping and torrent creation jobs.
//!
//! Layout: `http/router.rs` (server host), `http/*.rs` (handlers, SSE, middleware),
//! `state.rs` (shared state and health tracking), `error.rs`.

use std::sync::Arc;

use seedforge_core::{CreationWorkflow, PathInspector, RemoteTorrentClient};

/// Crate-level server errors.
pub mod error;
/// HTTP surface: router, handlers and middleware.
pub mod http;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;

/// Service handles the API dispatches to.
#[derive(Clone)]
pub struct CreationHandles {
    workflow: Arc<dyn CreationWorkflow>,
    inspector: Arc<dyn PathInspector>,
    remote: Arc<dyn RemoteTorrentClient>,
}

impl CreationHandles {
    /// Bundle the job workflow, the path inspector and the remote client.
    #[must_use]
    pub fn new(
        workflow: Arc<dyn CreationWorkflow>,
        inspector: Arc<dyn PathInspector>,
        remote: Arc<dyn RemoteTorrentClient>,
    ) -> Self {
        Self {
            workflow,
            inspector,
            remote,
        }
    }

    /// Creation job workflow.
    #[must_use]
    pub fn workflow(&self) -> &Arc<dyn CreationWorkflow> {
        &self.workflow
    }

    /// Scan and browse service.
    #[must_use]
    pub fn inspector(&self) -> &Arc<dyn PathInspector> {
        &self.inspector
    }

    /// Remote torrent client, used for the connection test.
    #[must_use]
    pub fn remote(&self) -> &Arc<dyn RemoteTorrentClient> {
        &self.remote
    }
}

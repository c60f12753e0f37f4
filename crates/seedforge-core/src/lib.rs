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

//! Domain model, sizing, path mapping and capability traits for torrent creation.
//!
//! Layout: error.rs (taxonomy), model/ (types), pieces.rs, mapping.rs, metainfo.rs,
//! validate.rs, service/ (traits).

pub mod error;
pub mod mapping;
pub mod metainfo;
pub mod model;
pub mod pieces;
pub mod service;
pub mod validate;

pub use error::{
    BoxedError, CreationError, CreationResult, ErrorKind, JobError, JobResult, ListingError,
    ListingResult, MappingError, MetainfoError, PieceSizeError, RemoteError, RemoteResult,
};
pub use mapping::{DiagnosticLevel, MappingDiagnostic, PathMapper, PathMapping};
pub use model::{
    ConnectionInfo, ContentMode, CreationJob, CreationOutcome, CreationParams, CreationRequest,
    CreationTask, DEFAULT_TARGET_PIECE_COUNT, DirectoryEntry, DirectoryListing, EntryKind,
    JobFailure, JobState, ListingSource, PathAnalysis, PieceSizeMode, PieceSizePlan,
    ProgressUpdate, SeedOptions, TaskPhase, TaskStatus, TorrentArtifact, TorrentFormat,
};
pub use pieces::{MAX_PIECE_SIZE, MIN_PIECE_SIZE, compute_piece_size, is_valid_piece_size};
pub use service::{
    CreationObserver, CreationWorkflow, DirectoryLister, NoopObserver, PathInspector,
    RemoteTorrentClient,
};
pub use validate::{resolve_piece_size, validate_request};

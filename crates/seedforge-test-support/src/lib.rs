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

//! Shared test helpers used across crates.
//! Layout: fixtures.rs (temporary trees), mocks.rs (scripted remote client, in-memory lister).

pub mod fixtures;
pub mod mocks;

pub use fixtures::TempTree;
pub use mocks::{
    MemoryLister, RemoteCall, SAMPLE_TORRENT, ScriptedFailure, ScriptedRemote, StatusStep,
};

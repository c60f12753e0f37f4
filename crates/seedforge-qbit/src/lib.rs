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

//! qBittorrent WebUI (API v2) client implementing the remote creation and listing traits.
//!
//! Layout: `client.rs` (session and request plumbing), `creator.rs`, `torrents.rs` and
//! `app.rs` (endpoint groups), `models.rs` (wire shapes), `remote.rs` (trait impls).

pub mod app;
pub mod client;
pub mod creator;
pub mod error;
pub mod models;
mod remote;
pub mod torrents;

pub use app::{CREATOR_MIN_MAJOR, creator_supported};
pub use client::{QbitClient, QbitClientConfig};
pub use creator::{creation_form, encode_trackers};
pub use error::{QbitError, QbitResult};

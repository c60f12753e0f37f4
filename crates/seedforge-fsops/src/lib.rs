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

//! Read-only filesystem helpers: path analysis, local listing and browse utilities.
//!
//! Layout: `analyzer.rs` (tree walk), `local.rs` (`LocalLister`), `browse.rs`
//! (normalisation, ordering, roots), `util.rs` (size and filename formatting).

pub mod analyzer;
pub mod browse;
pub mod error;
pub mod local;
pub mod util;

pub use analyzer::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_ENTRIES, LARGE_CONTENT_BYTES, PathAnalyzer};
pub use browse::{build_listing, default_roots, join_path, normalize_path, parent_path, sort_entries};
pub use error::{FsOpsError, FsOpsResult};
pub use local::LocalLister;
pub use util::{format_file_size, sanitize_filename};

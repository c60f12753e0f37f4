//! Command handlers grouped by concern.

pub(crate) mod content;
pub(crate) mod creations;
pub(crate) mod remote;
pub(crate) mod tail;

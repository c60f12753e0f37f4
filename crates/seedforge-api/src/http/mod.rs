//! HTTP surface modules (router, handlers, middleware).

/// Directory browsing endpoints.
pub(crate) mod browse;
/// Shared constants and header names.
pub(crate) mod constants;
/// Creation job endpoints.
pub(crate) mod creations;
/// Problem response helpers and error mapping.
pub(crate) mod errors;
/// Health and metrics endpoints.
pub(crate) mod health;
/// Path mapping endpoints.
pub(crate) mod paths;
/// Remote connection test.
pub(crate) mod remote;
/// Router construction and server host.
pub mod router;
/// Scan and piece sizing endpoints.
pub(crate) mod scan;
/// Server-sent event streams.
pub(crate) mod sse;
/// Metrics middleware for HTTP requests.
pub(crate) mod telemetry;

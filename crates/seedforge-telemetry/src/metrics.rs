//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Each [`Metrics`] owns its registry, so tests and embedded servers do not collide.
//! - Only collectors the creation pipeline and HTTP surface update are registered.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    creations_total: IntCounterVec,
    creation_fallback_total: IntCounter,
    active_creations: IntGauge,
    remote_poll_total: IntCounter,
    cleanup_failures_total: IntCounter,
    config_reload_failures_total: IntCounter,
}

/// Point-in-time values reported by `/health/full`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Creations currently running.
    pub active_creations: i64,
    /// Minimal-parameter retries performed.
    pub creation_fallback_total: u64,
    /// Status polls sent to the remote client.
    pub remote_poll_total: u64,
    /// Remote task deletions or seeding steps that failed.
    pub cleanup_failures_total: u64,
    /// Configuration reloads rejected by validation.
    pub config_reload_failures_total: u64,
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> TelemetryResult<C>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}

fn counter(registry: &Registry, name: &'static str, help: &str) -> TelemetryResult<IntCounter> {
    let collector = IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

fn counter_vec(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> TelemetryResult<IntCounterVec> {
    let collector = IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

impl Metrics {
    /// Construct a registry with the standard collectors.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be built or registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();
        let http_requests_total = counter_vec(
            &registry,
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let events_emitted_total = counter_vec(
            &registry,
            "events_emitted_total",
            "Domain events emitted by type",
            &["type"],
        )?;
        let creations_total = counter_vec(
            &registry,
            "creations_total",
            "Torrent creations by outcome",
            &["outcome"],
        )?;
        let creation_fallback_total = counter(
            &registry,
            "creation_fallback_total",
            "Creations retried with minimal parameters",
        )?;
        let active_creations = IntGauge::with_opts(Opts::new(
            "active_creations",
            "Creations currently in progress",
        ))
        .map_err(|source| TelemetryError::MetricsRegister {
            name: "active_creations",
            source,
        })?;
        let active_creations = register(&registry, "active_creations", active_creations)?;
        let remote_poll_total =
            counter(&registry, "remote_poll_total", "Remote task status polls")?;
        let cleanup_failures_total = counter(
            &registry,
            "cleanup_failures_total",
            "Failed remote task deletions and seeding steps",
        )?;
        let config_reload_failures_total = counter(
            &registry,
            "config_reload_failures_total",
            "Configuration reloads rejected",
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                events_emitted_total,
                creations_total,
                creation_fallback_total,
                active_creations,
                remote_poll_total,
                cleanup_failures_total,
                config_reload_failures_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Count a finished creation (`success`, `failed`, `timeout`, `cancelled`, ...).
    pub fn inc_creation(&self, outcome: &str) {
        self.inner
            .creations_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a minimal-parameter retry.
    pub fn inc_creation_fallback(&self) {
        self.inner.creation_fallback_total.inc();
    }

    /// A creation started.
    pub fn creation_started(&self) {
        self.inner.active_creations.inc();
    }

    /// A creation reached a terminal state.
    pub fn creation_finished(&self) {
        self.inner.active_creations.dec();
    }

    /// Count one remote status poll.
    pub fn inc_remote_poll(&self) {
        self.inner.remote_poll_total.inc();
    }

    /// Count a non-fatal cleanup or seeding failure.
    pub fn inc_cleanup_failure(&self) {
        self.inner.cleanup_failures_total.inc();
    }

    /// Count a rejected configuration reload.
    pub fn inc_config_reload_failure(&self) {
        self.inner.config_reload_failures_total.inc();
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or produces invalid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a snapshot of the gauges and counters reported by health checks.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_creations: self.inner.active_creations.get(),
            creation_fallback_total: self.inner.creation_fallback_total.get(),
            remote_poll_total: self.inner.remote_poll_total.get(),
            cleanup_failures_total: self.inner.cleanup_failures_total.get(),
            config_reload_failures_total: self.inner.config_reload_failures_total.get(),
        }
    }
}

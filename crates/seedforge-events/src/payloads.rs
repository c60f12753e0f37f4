//! Event payload types carried across the platform.

use chrono::{DateTime, Utc};
use seedforge_core::{ErrorKind, TaskPhase};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A creation job was accepted and is being prepared.
    CreationQueued {
        /// Job identifier.
        job_id: Uuid,
        /// Source path as requested.
        source_path: String,
    },
    /// The remote client accepted the creation task.
    CreationSubmitted {
        /// Job identifier.
        job_id: Uuid,
        /// Remote task identifier.
        task_id: String,
        /// Whether the minimal fallback parameters were used.
        fallback: bool,
    },
    /// Progress reported while the remote task is polled.
    CreationProgress {
        /// Job identifier.
        job_id: Uuid,
        /// Coarse phase.
        phase: TaskPhase,
        /// Progress, 0..=100.
        percent: f64,
        /// File being processed, when known.
        current_file: Option<String>,
        /// Estimated seconds remaining.
        eta_seconds: Option<u64>,
    },
    /// The job finished and its artifact is available.
    CreationCompleted {
        /// Job identifier.
        job_id: Uuid,
        /// Remote task identifier.
        task_id: String,
        /// Suggested artifact file name.
        artifact_name: String,
        /// Non-fatal issues.
        warnings: Vec<String>,
    },
    /// The job ended without an artifact (failure, timeout or cancellation).
    CreationFailed {
        /// Job identifier.
        job_id: Uuid,
        /// Error classification.
        kind: ErrorKind,
        /// Constant message for the kind.
        message: String,
        /// Context for the failure.
        detail: Option<String>,
    },
    /// Configuration was reloaded.
    SettingsChanged {
        /// Summary of the change.
        description: String,
    },
    /// Health status changed.
    HealthChanged {
        /// Degraded components; empty when healthy.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for SSE consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreationQueued { .. } => "queued",
            Self::CreationSubmitted { .. } => "submitted",
            Self::CreationProgress { .. } => "progress",
            Self::CreationCompleted { .. } => "done",
            Self::CreationFailed { .. } => "error",
            Self::SettingsChanged { .. } => "settings_changed",
            Self::HealthChanged { .. } => "health_changed",
        }
    }

    /// Job the event belongs to, for creation events.
    #[must_use]
    pub const fn job_id(&self) -> Option<Uuid> {
        match self {
            Self::CreationQueued { job_id, .. }
            | Self::CreationSubmitted { job_id, .. }
            | Self::CreationProgress { job_id, .. }
            | Self::CreationCompleted { job_id, .. }
            | Self::CreationFailed { job_id, .. } => Some(*job_id),
            Self::SettingsChanged { .. } | Self::HealthChanged { .. } => None,
        }
    }

    /// True for the final event of a creation job.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CreationCompleted { .. } | Self::CreationFailed { .. }
        )
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}

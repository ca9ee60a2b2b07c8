//! Export job entity and lifecycle states.

use chrono::{DateTime, Utc};
use pas_transport::{ExportOutput, JobHandle};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an export attempt.
///
/// Transitions are monotonic: `Idle → Requesting → InProgress →
/// {Completed | Failed}`, with `Failed` also reachable from
/// `Requesting`. `Completed` and `Failed` are terminal. Cancellation is
/// an orthogonal flag, not a state: it stops future polling, leaving the
/// last observed state readable, and marks the attempt as abandoned so a
/// new export may start. An attempt cancelled before a job was accepted
/// returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Idle,
    Requesting,
    InProgress,
    Completed,
    Failed,
}

impl ExportState {
    /// Returns `true` if no further transition can occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Requesting => write!(f, "requesting"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The single in-flight export job.
///
/// Created by the controller on a successful acceptance, mutated only
/// by its poll loop, and discarded when a new export starts. Never
/// persisted. `outputs` is populated exactly when the controller
/// reaches [`ExportState::Completed`].
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Opaque job token from the acceptance's status locator.
    pub job_id: String,
    /// Locator polled for status; may be relative to the service base.
    pub status_endpoint: String,
    /// Output files, in manifest order.
    pub outputs: Vec<ExportOutput>,
    /// Server-reported transaction time, set on completion.
    pub transaction_time: Option<DateTime<Utc>>,
    /// Terminal error description, set on failure.
    pub error_detail: Option<String>,
}

impl ExportJob {
    pub(crate) fn new(handle: JobHandle) -> Self {
        Self {
            job_id: handle.job_id,
            status_endpoint: handle.status_endpoint,
            outputs: Vec::new(),
            transaction_time: None,
            error_detail: None,
        }
    }

    pub(crate) fn handle(&self) -> JobHandle {
        JobHandle {
            job_id: self.job_id.clone(),
            status_endpoint: self.status_endpoint.clone(),
        }
    }
}

/// Read-only view of the controller's state for callers.
///
/// The job itself stays exclusively owned by the controller; the UI
/// only ever reads snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSnapshot {
    /// Current lifecycle state.
    pub state: ExportState,
    /// Whether cancellation was requested.
    pub cancelled: bool,
    /// Job id, once a job was accepted.
    pub job_id: Option<String>,
    /// Status locator, once a job was accepted.
    pub status_endpoint: Option<String>,
    /// Output files; non-empty only when `state` is `Completed`.
    pub outputs: Vec<ExportOutput>,
    /// Server-reported transaction time of a completed export.
    pub transaction_time: Option<DateTime<Utc>>,
    /// Error description of a failed export.
    pub error_detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization() {
        let state = ExportState::InProgress;
        let serialized = serde_json::to_string(&state).unwrap();
        assert_eq!(serialized, "\"in_progress\"");

        let deserialized: ExportState = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, state);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ExportState::Idle.to_string(), "idle");
        assert_eq!(ExportState::Requesting.to_string(), "requesting");
        assert_eq!(ExportState::InProgress.to_string(), "in_progress");
        assert_eq!(ExportState::Completed.to_string(), "completed");
        assert_eq!(ExportState::Failed.to_string(), "failed");
    }

    #[test]
    fn test_terminal_states() {
        assert!(ExportState::Completed.is_terminal());
        assert!(ExportState::Failed.is_terminal());
        assert!(!ExportState::Idle.is_terminal());
        assert!(!ExportState::Requesting.is_terminal());
        assert!(!ExportState::InProgress.is_terminal());
    }

    #[test]
    fn test_job_from_handle() {
        let job = ExportJob::new(JobHandle::from_status_endpoint("/_status/j9"));
        assert_eq!(job.job_id, "j9");
        assert_eq!(job.status_endpoint, "/_status/j9");
        assert!(job.outputs.is_empty());
        assert!(job.transaction_time.is_none());
        assert!(job.error_detail.is_none());
    }
}

//! Value types shared between the export core and transport backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for one bulk-export attempt.
///
/// Constructed once per attempt and never mutated afterwards. An empty
/// `resource_types` list means "all types"; an absent `since` means no
/// lower bound. Backends must omit the corresponding request parameters
/// entirely in those cases rather than sending empty values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Opaque group identifier the export is scoped to.
    pub group_reference: String,

    /// Resource types to include; empty means all.
    #[serde(default)]
    pub resource_types: Vec<String>,

    /// Only include resources updated at or after this instant.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

impl ExportRequest {
    /// Creates a request for everything in the given group.
    pub fn new(group_reference: impl Into<String>) -> Self {
        Self {
            group_reference: group_reference.into(),
            resource_types: Vec::new(),
            since: None,
        }
    }

    /// Restricts the export to the given resource types.
    #[must_use]
    pub fn with_resource_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts the export to resources updated since the given instant.
    #[must_use]
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// Handle to an accepted server-side export job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Opaque job token extracted from the status locator.
    pub job_id: String,

    /// Locator polled for job status; may be relative to the service base.
    pub status_endpoint: String,
}

impl JobHandle {
    /// Builds a handle from a status locator, taking the last non-empty
    /// path segment as the job id.
    pub fn from_status_endpoint(status_endpoint: impl Into<String>) -> Self {
        let status_endpoint = status_endpoint.into();
        let job_id = status_endpoint
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(status_endpoint.as_str())
            .to_string();
        Self {
            job_id,
            status_endpoint,
        }
    }
}

/// Outcome of a kick-off request.
///
/// `accepted` is only true when the service acknowledged asynchronous
/// processing and handed back a status locator. A synchronous success is
/// reported with `accepted: false` and the body preserved so the caller
/// can classify the protocol violation.
#[derive(Debug, Clone)]
pub struct ExportAcceptance {
    /// Whether the service accepted the job for asynchronous processing.
    pub accepted: bool,
    /// Transport-level status code of the kick-off response.
    pub status_code: u16,
    /// Handle for status polling, present iff `accepted`.
    pub job_handle: Option<JobHandle>,
    /// Body of a synchronous response, kept for diagnostics.
    pub immediate_body: Option<Value>,
}

/// One output file listed in a completed export manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOutput {
    /// Resource type the file contains.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Locator of the NDJSON file.
    #[serde(rename = "url")]
    pub locator: String,
}

/// Result of one status poll.
///
/// Backends report progress with an explicit `done` flag; the core never
/// infers job state from transport-specific headers.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Whether the job reached a terminal state.
    pub done: bool,
    /// Transport-level status code of the poll response.
    pub status_code: u16,
    /// Output files, present on successful completion (possibly empty).
    pub outputs: Option<Vec<ExportOutput>>,
    /// Server-reported transaction time of the export.
    pub transaction_time: Option<DateTime<Utc>>,
    /// Terminal error description, present on failed completion.
    pub error_message: Option<String>,
}

impl PollOutcome {
    /// A still-running poll result.
    #[must_use]
    pub fn running(status_code: u16) -> Self {
        Self {
            done: false,
            status_code,
            outputs: None,
            transaction_time: None,
            error_message: None,
        }
    }

    /// A successful terminal poll result.
    #[must_use]
    pub fn completed(
        status_code: u16,
        outputs: Vec<ExportOutput>,
        transaction_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            done: true,
            status_code,
            outputs: Some(outputs),
            transaction_time,
            error_message: None,
        }
    }

    /// A failed terminal poll result.
    #[must_use]
    pub fn failed(status_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            done: true,
            status_code,
            outputs: None,
            transaction_time: None,
            error_message: Some(error_message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = ExportRequest::new("Group/G1")
            .with_resource_types(["Patient", "Claim"])
            .with_since("2024-01-01T00:00:00Z".parse().unwrap());

        assert_eq!(request.group_reference, "Group/G1");
        assert_eq!(request.resource_types, vec!["Patient", "Claim"]);
        assert!(request.since.is_some());
    }

    #[test]
    fn test_job_handle_from_status_endpoint() {
        let handle = JobHandle::from_status_endpoint("http://fhir.test/_async-status/job-17");
        assert_eq!(handle.job_id, "job-17");
        assert_eq!(
            handle.status_endpoint,
            "http://fhir.test/_async-status/job-17"
        );

        let handle = JobHandle::from_status_endpoint("/_async-status/abc/");
        assert_eq!(handle.job_id, "abc");
    }

    #[test]
    fn test_export_output_manifest_names() {
        let output: ExportOutput = serde_json::from_value(serde_json::json!({
            "type": "Patient",
            "url": "http://fhir.test/files/patient.ndjson"
        }))
        .unwrap();
        assert_eq!(output.resource_type, "Patient");
        assert_eq!(output.locator, "http://fhir.test/files/patient.ndjson");
    }

    #[test]
    fn test_poll_outcome_constructors() {
        assert!(!PollOutcome::running(202).done);
        let done = PollOutcome::completed(200, vec![], None);
        assert!(done.done);
        assert_eq!(done.outputs.as_deref(), Some(&[][..]));
        let failed = PollOutcome::failed(500, "exploded");
        assert!(failed.done);
        assert_eq!(failed.error_message.as_deref(), Some("exploded"));
    }
}

//! The export job controller state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pas_ndjson::{NdjsonError, NdjsonPreview, stream_rows};
use pas_transport::{ExportRequest, TransportAdapter, TransportError};
use serde_json::Value;

use crate::config::ExportClientConfig;
use crate::error::ExportError;
use crate::job::{ExportJob, ExportSnapshot, ExportState};

/// Cloneable handle that requests cancellation of an export attempt.
///
/// Cancelling never blocks: an in-flight poll is allowed to complete,
/// but its result is discarded instead of being applied to the job.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one export attempt through the kick-off/poll protocol.
///
/// The controller exclusively owns the [`ExportJob`]; callers read
/// snapshots. Polling is sequential - `tick` is awaited to completion
/// before the next poll can be issued - so at most one poll is ever
/// outstanding and job mutation needs no locking.
pub struct ExportController {
    transport: Arc<dyn TransportAdapter>,
    config: ExportClientConfig,
    state: ExportState,
    job: Option<ExportJob>,
    /// Failure detail recorded before a job existed (rejected kick-off).
    early_error: Option<String>,
    cancelled: Arc<AtomicBool>,
}

impl ExportController {
    /// Creates an idle controller over the given transport.
    pub fn new(transport: Arc<dyn TransportAdapter>, config: ExportClientConfig) -> Self {
        Self {
            transport,
            config,
            state: ExportState::Idle,
            job: None,
            early_error: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Returns a token that can cancel this attempt from elsewhere.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(Arc::clone(&self.cancelled))
    }

    /// Requests cancellation of the current attempt.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(job) = &self.job {
            tracing::info!(job_id = %job.job_id, "Export cancelled");
        } else {
            tracing::info!("Export cancelled");
        }
    }

    /// Returns `true` if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Read-only view of the current state and job fields.
    #[must_use]
    pub fn snapshot(&self) -> ExportSnapshot {
        ExportSnapshot {
            state: self.state,
            cancelled: self.is_cancelled(),
            job_id: self.job.as_ref().map(|j| j.job_id.clone()),
            status_endpoint: self.job.as_ref().map(|j| j.status_endpoint.clone()),
            outputs: self.job.as_ref().map(|j| j.outputs.clone()).unwrap_or_default(),
            transaction_time: self.job.as_ref().and_then(|j| j.transaction_time),
            error_detail: self
                .job
                .as_ref()
                .and_then(|j| j.error_detail.clone())
                .or_else(|| self.early_error.clone()),
        }
    }

    /// Kicks off a new export attempt.
    ///
    /// Discards any previous job and clears the cancel flag, then issues
    /// the export request with asynchronous processing required. An
    /// acceptance carrying a job handle moves the attempt to
    /// `InProgress`; anything else - rejection, a synchronous success
    /// (protocol violation), an acceptance without a handle, or a
    /// transport failure - moves it to `Failed` with a descriptive
    /// detail.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidState`] if an attempt is already in
    /// flight; terminal and cancelled attempts may be restarted. A
    /// cancelled attempt counts as abandoned regardless of its last
    /// observed state.
    pub async fn start(&mut self, request: ExportRequest) -> Result<(), ExportError> {
        if !self.is_cancelled()
            && matches!(self.state, ExportState::Requesting | ExportState::InProgress)
        {
            return Err(ExportError::invalid_state("start", self.state));
        }

        self.job = None;
        self.early_error = None;
        self.cancelled.store(false, Ordering::SeqCst);
        self.state = ExportState::Requesting;

        tracing::info!(
            group = %request.group_reference,
            resource_types = ?request.resource_types,
            "Requesting bulk export"
        );

        let acceptance = match self.transport.request_export(&request, true).await {
            Ok(acceptance) => acceptance,
            Err(error) => {
                self.fail(format!("Export request failed: {error}"));
                return Ok(());
            }
        };

        if self.is_cancelled() {
            // No job was established; the attempt goes back to idle
            // rather than stranding a never-polled `Requesting`.
            tracing::debug!("Discarding kick-off result after cancellation");
            self.state = ExportState::Idle;
            return Ok(());
        }

        if !acceptance.accepted {
            let detail = if acceptance.status_code == 200 {
                "Protocol violation: asynchronous processing was requested \
                 but the service responded synchronously"
                    .to_string()
            } else {
                format!(
                    "Export request was not accepted (status {})",
                    acceptance.status_code
                )
            };
            self.fail(detail);
            return Ok(());
        }

        let Some(handle) = acceptance.job_handle else {
            self.fail("Protocol violation: acceptance did not carry a job handle".to_string());
            return Ok(());
        };

        tracing::info!(
            job_id = %handle.job_id,
            status_endpoint = %handle.status_endpoint,
            "Export job accepted"
        );

        self.job = Some(ExportJob::new(handle));
        self.state = ExportState::InProgress;
        Ok(())
    }

    /// Performs one status poll and applies the outcome.
    ///
    /// Still-running leaves the state unchanged. A terminal response
    /// stores the outputs and transaction time (`Completed`) or the
    /// error message (`Failed`). A transport failure is treated exactly
    /// like an error response and is never retried here. If cancellation
    /// was requested - before the poll or while it was outstanding - the
    /// outcome is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidState`] unless a job is in
    /// progress.
    pub async fn tick(&mut self) -> Result<(), ExportError> {
        let handle = match (self.state, &self.job) {
            (ExportState::InProgress, Some(job)) => job.handle(),
            _ => return Err(ExportError::invalid_state("tick", self.state)),
        };
        if self.is_cancelled() {
            return Ok(());
        }

        let outcome = self.transport.poll_status(&handle).await;

        if self.is_cancelled() {
            tracing::debug!(job_id = %handle.job_id, "Discarding poll result after cancellation");
            return Ok(());
        }

        match outcome {
            Err(error) => self.fail(format!("Status poll failed: {error}")),
            Ok(outcome) if !outcome.done => {
                tracing::debug!(job_id = %handle.job_id, "Export still in progress");
            }
            Ok(outcome) => {
                if let Some(message) = outcome.error_message {
                    self.fail(message);
                } else if let Some(job) = self.job.as_mut() {
                    job.outputs = outcome.outputs.unwrap_or_default();
                    job.transaction_time = outcome.transaction_time;
                    self.state = ExportState::Completed;
                    tracing::info!(
                        job_id = %job.job_id,
                        output_files = job.outputs.len(),
                        "Export completed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Polls on the configured interval until the attempt reaches a
    /// terminal state or is cancelled, then returns a snapshot.
    ///
    /// Polls are issued strictly one after another; a tick that has not
    /// returned delays the next interval rather than overlapping it.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidState`] if no attempt was started.
    pub async fn run_to_completion(&mut self) -> Result<ExportSnapshot, ExportError> {
        if matches!(self.state, ExportState::Idle | ExportState::Requesting) {
            return Err(ExportError::invalid_state("run_to_completion", self.state));
        }

        while self.state == ExportState::InProgress && !self.is_cancelled() {
            tokio::time::sleep(self.config.poll_interval()).await;
            self.tick().await?;
        }

        Ok(self.snapshot())
    }

    /// Fetches an output file in full and builds a bounded preview of
    /// its first rows. Preview path for small files only.
    ///
    /// # Errors
    ///
    /// Returns the transport failure if the file cannot be fetched.
    pub async fn fetch_preview(&self, locator: &str) -> Result<NdjsonPreview, TransportError> {
        let text = self.transport.fetch_text(locator).await?;
        Ok(NdjsonPreview::from_text(
            locator,
            text,
            self.config.preview_rows,
        ))
    }

    /// Streams an output file's rows to `on_row` without materializing
    /// the file, stopping early after `max_rows` if given.
    ///
    /// # Errors
    ///
    /// Returns a stream error if the file cannot be opened or fails
    /// mid-read.
    pub async fn stream_output<F>(
        &self,
        locator: &str,
        on_row: F,
        max_rows: Option<usize>,
    ) -> Result<usize, NdjsonError>
    where
        F: FnMut(usize, Value),
    {
        let stream = self
            .transport
            .open_stream(locator)
            .await
            .map_err(NdjsonError::Stream)?;
        stream_rows(stream, on_row, max_rows).await
    }

    fn fail(&mut self, detail: String) {
        tracing::error!(error = %detail, "Export failed");
        if let Some(job) = self.job.as_mut() {
            job.error_detail = Some(detail);
        } else {
            self.early_error = Some(detail);
        }
        self.state = ExportState::Failed;
    }
}

//! Capability traits implemented by transport backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::types::{ExportAcceptance, ExportRequest, JobHandle, PollOutcome};

/// The transport capability the export core is injected with.
///
/// Implementations must be thread-safe (`Send + Sync`). The contract is
/// deliberately not HTTP-specific: anything that can kick off an export,
/// poll for its status and read the produced files can back the core.
///
/// # Example
///
/// ```ignore
/// use pas_transport::{ExportRequest, TransportAdapter, TransportError};
///
/// async fn kick_off(
///     transport: &dyn TransportAdapter,
/// ) -> Result<bool, TransportError> {
///     let acceptance = transport
///         .request_export(&ExportRequest::new("Group/G1"), true)
///         .await?;
///     Ok(acceptance.accepted)
/// }
/// ```
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Issues the export kick-off request.
    ///
    /// With `prefer_async` set, the backend must ask the service for
    /// asynchronous processing. A synchronous success must still be
    /// reported as `Ok` with `accepted: false` so the caller can treat
    /// it as a protocol violation rather than a transport failure.
    ///
    /// # Errors
    ///
    /// Returns an error for connection failures and statuses that are
    /// neither an acceptance nor a synchronous success.
    async fn request_export(
        &self,
        request: &ExportRequest,
        prefer_async: bool,
    ) -> Result<ExportAcceptance, TransportError>;

    /// Polls the job's status endpoint once.
    ///
    /// # Errors
    ///
    /// Returns an error for connection failures, unreadable bodies, and
    /// statuses outside the protocol (the caller maps these to a failed
    /// job; it never retries).
    async fn poll_status(&self, handle: &JobHandle) -> Result<PollOutcome, TransportError>;

    /// Opens a chunked byte stream over an output file.
    ///
    /// The returned stream is exclusively owned by the caller, which must
    /// close it on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the locator is invalid or the file cannot be
    /// opened.
    async fn open_stream(&self, locator: &str) -> Result<Box<dyn ByteStream>, TransportError>;

    /// Fetches a small output file in full. Preview path only; large
    /// files go through [`TransportAdapter::open_stream`].
    ///
    /// # Errors
    ///
    /// Returns an error if the locator is invalid or the body cannot be
    /// read.
    async fn fetch_text(&self, locator: &str) -> Result<String, TransportError>;
}

/// A finite sequence of byte chunks with explicit early close.
///
/// `next_chunk` returning `Ok(None)` signals end of stream. `close`
/// releases upstream resources promptly; implementations must make it
/// safe to call after exhaustion or a read error, and more than once.
#[async_trait]
pub trait ByteStream: Send {
    /// Reads the next chunk, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source fails mid-stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Closes the stream, releasing the underlying source.
    async fn close(&mut self);
}

//! # pas-transport
//!
//! Transport abstraction for the PAS bulk-export client.
//!
//! This crate defines the capability traits and value types the export
//! core consumes. It does not contain any implementations - those are
//! provided by separate crates (see `pas-transport-http`).
//!
//! ## Overview
//!
//! The main trait is [`TransportAdapter`], which defines the contract for:
//! - Kicking off an asynchronous bulk export ([`TransportAdapter::request_export`])
//! - Polling the export status endpoint ([`TransportAdapter::poll_status`])
//! - Opening a chunked byte stream over an output file ([`TransportAdapter::open_stream`])
//! - Fetching a small output file in full for previews ([`TransportAdapter::fetch_text`])
//!
//! A [`ByteStream`] is the minimal streaming capability the NDJSON reader
//! needs: read the next chunk, signal end-of-stream, and support early
//! close so upstream resources (sockets) are released promptly.
//!
//! ## Example
//!
//! ```ignore
//! use pas_transport::{TransportAdapter, TransportError};
//!
//! async fn first_output_locator(
//!     transport: &dyn TransportAdapter,
//!     handle: &pas_transport::JobHandle,
//! ) -> Result<Option<String>, TransportError> {
//!     let outcome = transport.poll_status(handle).await?;
//!     Ok(outcome
//!         .outputs
//!         .and_then(|mut files| files.pop())
//!         .map(|f| f.locator))
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::TransportError;
pub use traits::{ByteStream, TransportAdapter};
pub use types::{ExportAcceptance, ExportOutput, ExportRequest, JobHandle, PollOutcome};

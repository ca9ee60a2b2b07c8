//! # pas-transport-http
//!
//! HTTP implementation of the `pas-transport` capability traits, backed
//! by `reqwest`.
//!
//! [`HttpTransport`] speaks the FHIR Bulk Data kick-off/poll protocol:
//!
//! - `GET {base}/Group/{id}/$export` with `Prefer: respond-async`;
//!   a `202 Accepted` acknowledgment carries the status locator in
//!   `Content-Location`.
//! - The status endpoint answers `202` while the job runs and `200`
//!   with the output manifest once it is done.
//! - Output files are NDJSON, fetched whole for previews or streamed
//!   chunk by chunk for large exports.

mod client;

pub use client::HttpTransport;

//! # pas-export
//!
//! Client-side lifecycle for FHIR Bulk Data exports.
//!
//! This crate owns the asynchronous export job state machine. The flow
//! mirrors the Bulk Data Access kick-off/poll protocol from the consumer
//! side:
//!
//! 1. [`ExportController::start`] issues `$export` with asynchronous
//!    processing requested and expects an acceptance carrying a job
//!    handle.
//! 2. The caller drives polling with [`ExportController::tick`] or the
//!    [`ExportController::run_to_completion`] loop; the controller keeps
//!    at most one poll outstanding.
//! 3. On completion the job exposes the output file descriptors; files
//!    are then previewed or streamed through the transport.
//!
//! Expected terminal failures (rejection, protocol violation, transport
//! failure during a poll) are represented as job state, not errors;
//! `Err` is reserved for programmer misuse such as polling a job that
//! was never started. The core never retries a failed poll - retry
//! policy is a caller concern.
//!
//! Scheduling is deliberately not baked in: the state machine only
//! requires that something invokes the next poll, whether that is a
//! timer, a cooperative loop, or a dedicated task.
//!
//! ## References
//!
//! - [Bulk Data Access IG](http://hl7.org/fhir/uv/bulkdata/)
//! - [FHIR Asynchronous Request Pattern](http://hl7.org/fhir/async.html)

mod config;
mod controller;
mod error;
mod job;

pub use config::ExportClientConfig;
pub use controller::{CancelToken, ExportController};
pub use error::ExportError;
pub use job::{ExportJob, ExportSnapshot, ExportState};

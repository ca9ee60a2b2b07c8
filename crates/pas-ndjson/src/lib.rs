//! # pas-ndjson
//!
//! Streaming NDJSON (newline-delimited JSON) ingestion for bulk-export
//! output files.
//!
//! Export files are not valid JSON as a whole; each line is an
//! independently parseable resource. Files can be arbitrarily large and
//! arrive in network chunks that cut lines (and UTF-8 sequences) at
//! arbitrary byte offsets, so ingestion is incremental:
//!
//! - [`LineSplitter`] turns a chunk sequence into complete lines,
//!   buffering the partial tail across chunk boundaries.
//! - [`decode_line`] parses one line, reporting failures without
//!   aborting the stream.
//! - The reader functions compose the two into three access patterns:
//!   [`count_rows`] and [`first_n_rows`] for previews over fully fetched
//!   text, and [`stream_rows`] for push-style consumption of files too
//!   large to hold in memory.
//!
//! Decoding is best effort throughout: a malformed line is logged and
//! skipped, because export consumers must not abort on one bad line.

mod decoder;
mod reader;
mod splitter;

pub use decoder::{DecodeError, decode_line};
pub use reader::{NdjsonError, NdjsonPreview, count_rows, first_n_rows, stream_rows};
pub use splitter::LineSplitter;

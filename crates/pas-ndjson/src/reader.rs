//! The three NDJSON access patterns: row counting, bounded prefix reads
//! and push-style streaming.

use pas_transport::{ByteStream, TransportError};
use serde_json::Value;

use crate::decoder::decode_line;
use crate::splitter::LineSplitter;

/// Errors that can occur while streaming NDJSON rows.
#[derive(Debug, thiserror::Error)]
pub enum NdjsonError {
    /// The underlying byte stream failed mid-read.
    #[error("Stream read failed: {0}")]
    Stream(#[from] TransportError),
}

/// Counts non-blank lines. O(n), no decoding.
///
/// A line that parses as JSON but is not a plausible resource still
/// counts; a malformed line counts too.
pub fn count_rows(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Decodes the first `n` decodable rows of fully fetched text.
///
/// Malformed lines are logged, skipped, and do not count toward `n`.
pub fn first_n_rows(text: &str, n: usize) -> Vec<Value> {
    let mut rows = Vec::new();
    for line in text.lines() {
        if rows.len() == n {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(line) {
            Ok(record) => rows.push(record),
            Err(error) => {
                tracing::warn!(%error, "Skipping undecodable NDJSON line");
            }
        }
    }
    rows
}

/// Streams decoded rows out of a byte stream, pushing each to `on_row`.
///
/// Rows are delivered in file order, exactly once each, with a
/// monotonically increasing index starting at 0. Malformed lines are
/// logged and skipped without an index. When `max_rows` is reached the
/// source is actively closed so upstream resources are released
/// promptly; the stream is closed on every exit path, including read
/// errors. Returns the number of rows delivered.
///
/// # Errors
///
/// Returns [`NdjsonError::Stream`] if the underlying stream fails; rows
/// delivered before the failure stand.
pub async fn stream_rows<F>(
    mut stream: Box<dyn ByteStream>,
    mut on_row: F,
    max_rows: Option<usize>,
) -> Result<usize, NdjsonError>
where
    F: FnMut(usize, Value),
{
    let mut cursor = StreamCursor::new();

    if max_rows == Some(0) {
        stream.close().await;
        return Ok(0);
    }

    loop {
        let chunk = match stream.next_chunk().await {
            Ok(chunk) => chunk,
            Err(error) => {
                stream.close().await;
                return Err(error.into());
            }
        };

        let Some(chunk) = chunk else { break };

        for line in cursor.splitter.push(&chunk) {
            if cursor.deliver(&line, &mut on_row) && max_rows == Some(cursor.delivered) {
                stream.close().await;
                return Ok(cursor.delivered);
            }
        }
    }

    if let Some(line) = std::mem::take(&mut cursor.splitter).finish() {
        cursor.deliver(&line, &mut on_row);
    }

    stream.close().await;
    Ok(cursor.delivered)
}

/// Consumption state for one pass over one stream. Not resettable; a new
/// stream gets a new cursor.
struct StreamCursor {
    splitter: LineSplitter,
    delivered: usize,
}

impl StreamCursor {
    fn new() -> Self {
        Self {
            splitter: LineSplitter::new(),
            delivered: 0,
        }
    }

    /// Decodes one line and pushes it to the callback. Returns whether a
    /// row was delivered.
    fn deliver<F>(&mut self, line: &str, on_row: &mut F) -> bool
    where
        F: FnMut(usize, Value),
    {
        match decode_line(line) {
            Ok(record) => {
                on_row(self.delivered, record);
                self.delivered += 1;
                true
            }
            Err(error) => {
                tracing::warn!(%error, "Skipping undecodable NDJSON line");
                false
            }
        }
    }
}

/// A bounded, read-only snapshot of an output file for UI previews.
///
/// Built from fully fetched text only; large files are consumed through
/// [`stream_rows`] and never retained in memory whole.
#[derive(Debug, Clone)]
pub struct NdjsonPreview {
    /// Locator the text was fetched from.
    pub source_locator: String,
    /// Count of non-blank lines, decodable or not.
    pub total_row_count: usize,
    /// First N decoded records; never longer than `total_row_count`.
    pub preview_rows: Vec<Value>,
    /// The full fetched text.
    pub raw_text: String,
}

impl NdjsonPreview {
    /// Builds a preview with at most `preview_rows` decoded records.
    pub fn from_text(
        source_locator: impl Into<String>,
        raw_text: String,
        preview_rows: usize,
    ) -> Self {
        Self {
            source_locator: source_locator.into(),
            total_row_count: count_rows(&raw_text),
            preview_rows: first_n_rows(&raw_text, preview_rows),
            raw_text,
        }
    }
}

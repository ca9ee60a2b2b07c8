//! Incremental line splitting over byte chunks.

/// Splits an incrementally arriving byte sequence into complete lines.
///
/// The splitter owns a single pending buffer holding everything after
/// the last observed line terminator. [`LineSplitter::push`] drains all
/// complete lines out of a chunk; [`LineSplitter::finish`] emits the
/// unterminated tail at end of stream, which is the only point where
/// content without a terminator becomes a line.
///
/// Lines are terminator-stripped (`\n`, with a preceding `\r` also
/// removed) and blank-after-trim lines are filtered here, so downstream
/// decoding never sees them. Splitting operates on bytes rather than
/// text because a chunk boundary can fall inside a multi-byte UTF-8
/// sequence.
///
/// Identical total input yields the identical line sequence regardless
/// of how it was chunked.
#[derive(Debug, Default)]
pub struct LineSplitter {
    /// Pending partial line; never contains a terminator.
    buffer: Vec<u8>,
}

impl LineSplitter {
    /// Creates a splitter with an empty pending buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_terminator) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.buffer.drain(..=last_terminator).collect();
        complete
            .split(|&b| b == b'\n')
            .filter_map(line_from_bytes)
            .collect()
    }

    /// Consumes the splitter, emitting the pending tail as a final line.
    pub fn finish(self) -> Option<String> {
        line_from_bytes(&self.buffer)
    }

    /// Returns `true` if no partial line is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn line_from_bytes(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.into_owned())
    }
}

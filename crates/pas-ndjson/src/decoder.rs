//! Per-line record decoding.

use serde_json::Value;

/// A single NDJSON line that failed to parse.
///
/// Non-fatal by design: the pipeline skips the line and continues, so
/// the error keeps the offending content for logging and diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("Undecodable NDJSON line: {source}")]
pub struct DecodeError {
    /// The offending line content.
    pub line: String,
    /// The underlying JSON parse failure.
    #[source]
    pub source: serde_json::Error,
}

/// Parses one NDJSON line into a record.
///
/// Whether the value is a plausible domain resource is not checked here;
/// row counting is line counting, not semantic validation.
///
/// # Errors
///
/// Returns a [`DecodeError`] carrying the line if it is not valid JSON.
pub fn decode_line(line: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(line).map_err(|source| DecodeError {
        line: line.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_line() {
        let record = decode_line("{\"resourceType\":\"Patient\",\"id\":\"1\"}").unwrap();
        assert_eq!(record["resourceType"], "Patient");
    }

    #[test]
    fn test_decode_failure_keeps_line() {
        let err = decode_line("{bad json}").unwrap_err();
        assert_eq!(err.line, "{bad json}");
        assert!(err.to_string().starts_with("Undecodable NDJSON line"));
    }

    #[test]
    fn test_non_object_json_still_decodes() {
        // Any parseable JSON value counts as a record at this layer.
        assert!(decode_line("42").is_ok());
        assert!(decode_line("\"text\"").is_ok());
    }
}

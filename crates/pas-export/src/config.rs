//! Export client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the export client.
///
/// Retry and backoff knobs are deliberately absent; the core never
/// retries a failed poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportClientConfig {
    /// Delay between status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of rows decoded for an output-file preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_poll_interval_ms() -> u64 {
    3_000
}
fn default_preview_rows() -> usize {
    10
}

impl Default for ExportClientConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl ExportClientConfig {
    /// The poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

//! Error types for the transport abstraction layer.

/// Errors that can occur while talking to the export service.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to reach the service at all (DNS, connect, timeout).
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The service answered with a status the caller cannot proceed from.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP-level status code.
        status: u16,
        /// Response body, kept for error reporting.
        body: String,
    },

    /// A locator could not be parsed or resolved against the service base.
    #[error("Invalid locator '{locator}': {message}")]
    InvalidLocator {
        /// The offending locator.
        locator: String,
        /// Description of what is wrong with it.
        message: String,
    },

    /// The response body could not be read or decoded.
    #[error("Body error: {message}")]
    Body {
        /// Description of the body failure.
        message: String,
    },
}

impl TransportError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `UnexpectedStatus` error.
    #[must_use]
    pub fn unexpected_status(status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            body: body.into(),
        }
    }

    /// Creates a new `InvalidLocator` error.
    #[must_use]
    pub fn invalid_locator(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Body` error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }

    /// Returns `true` if this error was raised for a non-success status.
    #[must_use]
    pub fn is_unexpected_status(&self) -> bool {
        matches!(self, Self::UnexpectedStatus { .. })
    }
}

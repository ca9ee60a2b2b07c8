//! Error types for the export controller.

use crate::job::ExportState;

/// Hard failures of the export controller.
///
/// Only programmer misuse is an `Err`; expected terminal outcomes
/// (rejection, protocol violation, transport failure) are represented
/// as [`ExportState::Failed`] with an error detail on the snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The operation is not valid in the controller's current state,
    /// e.g. polling a job that was never started.
    #[error("Cannot {operation} while export is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the controller was in.
        state: ExportState,
    },
}

impl ExportError {
    pub(crate) fn invalid_state(operation: &'static str, state: ExportState) -> Self {
        Self::InvalidState { operation, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExportError::invalid_state("tick", ExportState::Idle);
        assert_eq!(err.to_string(), "Cannot tick while export is idle");
    }
}

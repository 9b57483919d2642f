//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] crate::relay::payload::PayloadError),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(String),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Unknown routing mode: {0}")]
    UnknownRoutingMode(String),

    #[error("Upstream line exceeds {limit} bytes without a newline")]
    LineTooLong { limit: usize },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::UnknownParticipant("c".to_string()).is_cancelled());
        assert!(!DomainError::InvalidRequestId(String::new()).is_cancelled());
    }
}

//! Coordinator Error Types
//!
//! - Transport failures pass through unchanged
//! - A failed position capture is not an error (fail-open)
//! - A replication timeout is a typed error unless the call asked to abort
//! - A malformed captured position is fatal

use std::time::Duration;

use thiserror::Error;

use crate::position::PositionError;
use crate::tracker::TrackerError;

/// Result type for coordinated calls
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// RPC transport failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No node in the target region answered
    #[error("Region {0} unreachable")]
    Unreachable(String),

    /// Call exceeded its RPC timeout
    #[error("Remote call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Remote side raised while executing the operation
    #[error("Remote failure: {0}")]
    Remote(String),
}

/// Failure of the operation itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Operation {operation} failed: {message}")]
pub struct OperationError {
    pub operation: String,
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Coordinator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// RPC transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Local execution failed
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// Requested tracker does not exist
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Primary reported an unparseable insert position
    #[error("Invalid captured position: {0}")]
    InvalidPosition(#[from] PositionError),

    /// Write not visible locally within the replication timeout
    #[error("Operation {operation} not replicated after {}ms", .elapsed.as_millis())]
    ReplicationTimeout { operation: String, elapsed: Duration },
}

impl CoordinatorError {
    /// Check if this error is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidPosition(_))
    }

    /// Check if this is a replication timeout.
    pub fn is_replication_timeout(&self) -> bool {
        matches!(self, Self::ReplicationTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_passes_through() {
        let err: CoordinatorError = TransportError::Unreachable("us-east".into()).into();
        assert_eq!(err.to_string(), "Region us-east unreachable");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invalid_position_fatal() {
        let err: CoordinatorError = PositionError::Malformed("zz".into()).into();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_replication_timeout_display() {
        let err = CoordinatorError::ReplicationTimeout {
            operation: "insert_user".into(),
            elapsed: Duration::from_millis(250),
        };
        assert!(err.is_replication_timeout());
        assert_eq!(
            err.to_string(),
            "Operation insert_user not replicated after 250ms"
        );
    }
}

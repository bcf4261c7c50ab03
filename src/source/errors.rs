//! Database Query Error Types
//!
//! A failed query only means a tracking gap: waiters keep waiting, bounded
//! by their own timeouts. None of these errors is fatal.

use std::time::Duration;

use thiserror::Error;

/// Result type for database queries
pub type SourceResult<T> = Result<T, SourceError>;

/// Database query errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Query executed and failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Connection lost or unavailable
    #[error("Connection unavailable: {0}")]
    Unavailable(String),

    /// No answer within the client-side bound
    #[error("Query timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl SourceError {
    /// Query errors never stop tracking.
    pub fn is_fatal(&self) -> bool {
        false
    }
}

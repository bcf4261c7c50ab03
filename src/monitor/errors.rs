//! Monitor Error Types
//!
//! Query failures are retried forever; a malformed position report stops
//! the monitor.

use thiserror::Error;

use crate::position::PositionError;
use crate::source::SourceError;

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Monitor errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// Long-poll query failed
    #[error("Replay query failed: {0}")]
    Source(#[from] SourceError),

    /// Database reported an unparseable position
    #[error("Invalid replay position: {0}")]
    Position(#[from] PositionError),

    /// Monitor task panicked or was cancelled
    #[error("Monitor task failed: {0}")]
    Task(String),
}

impl MonitorError {
    /// Check if this error stops the monitor.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Source(e) => e.is_fatal(),
            Self::Position(e) => e.is_fatal(),
            Self::Task(_) => true,
        }
    }
}

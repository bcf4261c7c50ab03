//! Log Position Error Types
//!
//! A malformed position report is a contract violation with the database,
//! never a runtime condition to recover from. Every variant is fatal.

use thiserror::Error;

/// Result type for log position parsing
pub type PositionResult<T> = Result<T, PositionError>;

/// Log position errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// Text is not `<hex-segment>/<hex-offset>`
    #[error("Malformed log position: {0:?}")]
    Malformed(String),

    /// A null report where only replay positions may be null
    #[error("Missing {0} position: only replay reports may be null")]
    Missing(&'static str),

    /// Text supplied for an origin that has no textual form
    #[error("Position text {0:?} supplied for a non-replicating store")]
    UnexpectedText(String),
}

impl PositionError {
    /// Position errors always fail fast.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

//! Tracker Error Types

use thiserror::Error;

/// Result type for tracker selection
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Tracker selection errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// No tracker registered under this name
    #[error("Unknown tracker: {0}")]
    UnknownTracker(String),

    /// Two trackers share a name
    #[error("Duplicate tracker: {0}")]
    DuplicateTracker(String),

    /// Set built without any tracker
    #[error("Tracker set is empty")]
    NoTrackers,
}

impl TrackerError {
    /// Building a bad set is fatal; naming an unknown tracker in a call is not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnknownTracker(_))
    }
}

//! Database Query Interface
//!
//! Two query shapes against the tracked store:
//! - the current insert position, read on the primary right after a write
//! - a long poll: block up to N seconds for the replay position to move
//!   past a known one, or return empty
//!
//! Positions cross this boundary as the database's own text
//! (`<hex-segment>/<hex-offset>`); parsing happens on this side.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::errors::SourceResult;
use crate::position::LogPosition;

/// Boxed future returned by query seams
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the caller already knows about the replay position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayCursor {
    /// Nothing observed yet: answer immediately
    Unknown,
    /// Last answer was null (store not replicating)
    NotReplicating,
    /// Last observed position text
    At(String),
}

impl ReplayCursor {
    /// Cursor for the last cached local position.
    pub fn from_position(position: Option<&LogPosition>) -> Self {
        match position {
            None => Self::Unknown,
            Some(position) => match position.serialize() {
                Some(text) => Self::At(text),
                None => Self::NotReplicating,
            },
        }
    }
}

/// Long-poll answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayReport {
    /// Replay position moved; `None` is a null report
    Advanced(Option<String>),
    /// Server-side timeout elapsed with no movement
    Unchanged,
}

/// Query handle for one tracked store
pub trait ReplicationSource: Send + Sync {
    /// Current insert-origin position text.
    fn insert_position(&self) -> BoxFuture<'_, SourceResult<String>>;

    /// Block server-side until the replay position moves past `cursor`
    /// or `timeout` elapses.
    fn wait_for_replay(
        &self,
        cursor: ReplayCursor,
        timeout: Duration,
    ) -> BoxFuture<'_, SourceResult<ReplayReport>>;
}

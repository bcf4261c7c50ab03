//! In-memory replicated store
//!
//! Plays both sides of a primary/replica pair in one process: writes move
//! the insert position, `replay_*` moves the local replay position. The
//! long poll behaves like the server-side function it stands in for,
//! re-checking on a short cadence until the position moves or the timeout
//! elapses. Failures can be injected for either query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use super::errors::{SourceError, SourceResult};
use super::query::{BoxFuture, ReplayCursor, ReplayReport, ReplicationSource};
use crate::position::{LogPosition, Lsn};

/// Default server-side re-check cadence
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct State {
    insert: Lsn,
    /// `None` when the store is not replicating
    replay: Option<Lsn>,
    failing_polls: u32,
    failing_inserts: bool,
}

/// In-memory [`ReplicationSource`]
#[derive(Debug)]
pub struct InMemorySource {
    state: Mutex<State>,
    check_interval: Duration,
    polls: AtomicU64,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySource {
    /// Empty store at `0/0`, fully replayed.
    pub fn new() -> Self {
        Self::with_check_interval(DEFAULT_CHECK_INTERVAL)
    }

    /// Store with a custom server-side re-check cadence.
    pub fn with_check_interval(check_interval: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                insert: Lsn::new(0, 0),
                replay: Some(Lsn::new(0, 0)),
                failing_polls: 0,
                failing_inserts: false,
            }),
            check_interval,
            polls: AtomicU64::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `bytes` of WAL on the primary; returns the new insert position.
    pub fn write(&self, bytes: u64) -> LogPosition {
        let mut state = self.state();
        state.insert = Lsn::from_u64(state.insert.as_u64().saturating_add(bytes));
        LogPosition::Insert(state.insert)
    }

    /// Move the local replay position.
    pub fn replay_to(&self, lsn: Lsn) {
        self.state().replay = Some(lsn);
    }

    /// Replay everything written so far.
    pub fn replay_all(&self) {
        let mut state = self.state();
        state.replay = Some(state.insert);
    }

    /// Report null replay positions from now on.
    pub fn set_not_replicating(&self) {
        self.state().replay = None;
    }

    /// Fail the next `count` long polls.
    pub fn fail_next_polls(&self, count: u32) {
        self.state().failing_polls = count;
    }

    /// Fail insert-position lookups until turned off.
    pub fn fail_insert_lookups(&self, failing: bool) {
        self.state().failing_inserts = failing;
    }

    /// Current insert position.
    pub fn insert_lsn(&self) -> Lsn {
        self.state().insert
    }

    /// Current replay position.
    pub fn replay_lsn(&self) -> Option<Lsn> {
        self.state().replay
    }

    /// Long polls received, failed ones included.
    pub fn poll_count(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    fn check(&self, cursor: &ReplayCursor, known: Option<Lsn>) -> Option<ReplayReport> {
        let current = self.state().replay;
        let moved = match (cursor, current, known) {
            (ReplayCursor::Unknown, _, _) => true,
            (ReplayCursor::NotReplicating, current, _) => current.is_some(),
            (ReplayCursor::At(_), None, _) => true,
            (ReplayCursor::At(_), Some(current), Some(known)) => current > known,
            (ReplayCursor::At(_), Some(_), None) => true,
        };
        moved.then(|| ReplayReport::Advanced(current.map(|lsn| lsn.to_string())))
    }

    async fn long_poll(
        &self,
        cursor: ReplayCursor,
        timeout: Duration,
    ) -> SourceResult<ReplayReport> {
        self.polls.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = self.state();
            if state.failing_polls > 0 {
                state.failing_polls -= 1;
                return Err(SourceError::Unavailable("connection reset".to_string()));
            }
        }

        let known = match &cursor {
            ReplayCursor::At(text) => Some(
                text.parse::<Lsn>()
                    .map_err(|e| SourceError::Query(e.to_string()))?,
            ),
            _ => None,
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(report) = self.check(&cursor, known) {
                return Ok(report);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(ReplayReport::Unchanged);
            }
            tokio::time::sleep(self.check_interval.min(deadline - now)).await;
        }
    }
}

impl ReplicationSource for InMemorySource {
    fn insert_position(&self) -> BoxFuture<'_, SourceResult<String>> {
        Box::pin(async move {
            let state = self.state();
            if state.failing_inserts {
                return Err(SourceError::Query("insert position lookup failed".to_string()));
            }
            Ok(state.insert.to_string())
        })
    }

    fn wait_for_replay(
        &self,
        cursor: ReplayCursor,
        timeout: Duration,
    ) -> BoxFuture<'_, SourceResult<ReplayReport>> {
        Box::pin(self.long_poll(cursor, timeout))
    }
}

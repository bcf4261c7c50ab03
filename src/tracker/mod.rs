//! Replication Tracking
//!
//! The shared engine that lets many concurrent callers wait for one log
//! position each:
//! - one tracker per tracked store, owning the cached local position and
//!   the pending-request registry
//! - callers wait through a [`Mailbox`], at most one pending request per
//!   caller (last request wins)
//! - only the tracker's evaluation step settles requests, so each pending
//!   entry is notified at most once
//! - a timed-out waiter withdraws its own entry

mod errors;
mod notification;
mod registry;
mod set;
mod sweeper;
#[allow(clippy::module_inception)]
mod tracker;

pub use errors::{TrackerError, TrackerResult};
pub use notification::{CallerId, Mailbox, Notification, WaitOutcome};
pub use set::TrackerSet;
pub use sweeper::SweeperHandle;
pub use tracker::{ReplicationTracker, TrackerStats};

//! Pending request registry
//!
//! At most one pending entry per caller; a newer request from the same
//! caller replaces the older one. Entries leave the registry in exactly
//! three ways, all under the tracker's registry lock:
//! - settled: target satisfied, one notification sent
//! - withdrawn: the caller's own wait timed out
//! - pruned: the caller's mailbox is gone

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::notification::{CallerId, Notification, NotificationSender};
use crate::position::LogPosition;

/// One registered wait
#[derive(Debug)]
pub(crate) struct PendingRequest {
    caller: CallerId,
    target: LogPosition,
    created_at: Instant,
    registered_at: DateTime<Utc>,
    reply: NotificationSender,
}

impl PendingRequest {
    pub fn new(caller: CallerId, target: LogPosition, reply: NotificationSender) -> Self {
        Self {
            caller,
            target,
            created_at: Instant::now(),
            registered_at: Utc::now(),
            reply,
        }
    }

    fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Oldest pending entry, as reported in stats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OldestPending {
    pub age: Duration,
    pub registered_at: DateTime<Utc>,
}

/// Outcome of one evaluation pass
#[derive(Debug, Default)]
pub(crate) struct Settlement {
    pub notified: Vec<Notification>,
    pub pruned: usize,
}

#[derive(Debug, Default)]
pub(crate) struct PendingRegistry {
    entries: HashMap<CallerId, PendingRequest>,
}

impl PendingRegistry {
    /// Insert or replace; returns the replaced target.
    pub fn upsert(&mut self, request: PendingRequest) -> Option<LogPosition> {
        self.entries
            .insert(request.caller, request)
            .map(|previous| previous.target)
    }

    /// Remove the caller's entry if it still targets `target` and still
    /// replies into `reply`'s mailbox.
    pub fn withdraw(
        &mut self,
        caller: CallerId,
        target: &LogPosition,
        reply: &NotificationSender,
    ) -> bool {
        match self.entries.get(&caller) {
            Some(entry) if entry.target == *target && entry.reply.same_channel(reply) => {
                self.entries.remove(&caller);
                true
            }
            _ => false,
        }
    }

    /// Notify and remove every entry `local` satisfies; drop dead mailboxes.
    pub fn settle(&mut self, local: Option<&LogPosition>) -> Settlement {
        let mut settlement = Settlement::default();

        self.entries.retain(|_, entry| {
            if entry.reply.is_closed() {
                settlement.pruned += 1;
                return false;
            }
            let Some(local) = local else {
                return true;
            };
            if !local.satisfies(&entry.target) {
                return true;
            }

            let notification = Notification {
                caller: entry.caller,
                target: entry.target,
            };
            if entry.reply.send(notification).is_ok() {
                settlement.notified.push(notification);
            } else {
                settlement.pruned += 1;
            }
            false
        });

        settlement
    }

    pub fn target_of(&self, caller: CallerId) -> Option<LogPosition> {
        self.entries.get(&caller).map(|entry| entry.target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn oldest(&self) -> Option<OldestPending> {
        self.entries
            .values()
            .min_by_key(|entry| entry.created_at)
            .map(|entry| OldestPending {
                age: entry.age(),
                registered_at: entry.registered_at,
            })
    }
}

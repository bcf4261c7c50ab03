//! Replication Tracker
//!
//! Owns the replication state of one tracked store:
//! - a single-slot cache of the last observed local replay position
//! - the registry of pending wait requests
//!
//! `evaluate_pending` is the only place requests are settled. It runs
//! under the registry lock, so evaluations triggered from the monitor,
//! the sweeper and fresh registrations are serialized and every pending
//! entry is notified at most once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::SecondsFormat;
use serde::Serialize;

use super::notification::{CallerId, Mailbox, WaitOutcome};
use super::registry::{PendingRegistry, PendingRequest};
use crate::observability::{
    log_event_at, log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot, Severity,
};
use crate::position::{LogPosition, Origin};
use crate::source::ReplicationSource;

/// Replication state for one tracked store
pub struct ReplicationTracker {
    name: String,
    source: Arc<dyn ReplicationSource>,
    latest: RwLock<Option<LogPosition>>,
    pending: Mutex<PendingRegistry>,
    metrics: MetricsRegistry,
}

impl std::fmt::Debug for ReplicationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationTracker")
            .field("name", &self.name)
            .field("latest", &self.latest_local())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ReplicationTracker {
    /// Create a tracker bound to the store behind `source`.
    pub fn new(name: impl Into<String>, source: Arc<dyn ReplicationSource>) -> Self {
        let name = name.into();
        log_event_with_fields(Event::TrackerCreated, &[("tracker", &name)]);
        Self {
            name,
            source,
            latest: RwLock::new(None),
            pending: Mutex::new(PendingRegistry::default()),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Tracker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query handle for the tracked store
    pub fn source(&self) -> &Arc<dyn ReplicationSource> {
        &self.source
    }

    /// Counters for this tracker
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    fn registry(&self) -> MutexGuard<'_, PendingRegistry> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- cache ----

    /// Last observed local position; `None` before the first successful query.
    pub fn latest_local(&self) -> Option<LogPosition> {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the cached position. An unavailable reading is ignored so
    /// a failed query never blanks the cache.
    pub fn record_local(&self, position: Option<LogPosition>) {
        let Some(position) = position else {
            return;
        };
        debug_assert_ne!(position.origin(), Origin::Insert);

        let previous = {
            let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
            latest.replace(position)
        };
        self.metrics.increment_positions_recorded();

        let regressed = matches!(
            (previous.and_then(|p| p.lsn()), position.lsn()),
            (Some(before), Some(after)) if after < before
        );
        if regressed {
            log_event_at(
                Severity::Warn,
                Event::PositionRegressed,
                &[
                    ("from", &previous.map(|p| p.to_string()).unwrap_or_default()),
                    ("to", &position.to_string()),
                    ("tracker", &self.name),
                ],
            );
        } else {
            log_event_at(
                Severity::Trace,
                Event::PositionRecorded,
                &[("position", &position.to_string()), ("tracker", &self.name)],
            );
        }
    }

    /// Record a fresh reading and settle whatever it satisfies.
    pub fn observe(&self, position: LogPosition) -> usize {
        self.record_local(Some(position));
        self.evaluate_pending()
    }

    /// Compare `target` against the cache; false while the cache is empty.
    pub fn is_satisfied(&self, target: &LogPosition) -> bool {
        self.latest_local()
            .map(|local| local.satisfies(target))
            .unwrap_or(false)
    }

    // ---- registry ----

    /// Register (or replace) the pending request of `mailbox`'s caller.
    /// Does not block.
    pub fn request_notification(&self, mailbox: &Mailbox, target: LogPosition) {
        let caller = mailbox.id();
        let replaced = self
            .registry()
            .upsert(PendingRequest::new(caller, target, mailbox.sender()));

        self.metrics.increment_requests_registered();
        let caller_text = caller.to_string();
        let target_text = target.to_string();
        match replaced {
            Some(previous) => {
                self.metrics.increment_requests_replaced();
                log_event_at(
                    Severity::Trace,
                    Event::RequestReplaced,
                    &[
                        ("caller", &caller_text),
                        ("previous", &previous.to_string()),
                        ("target", &target_text),
                        ("tracker", &self.name),
                    ],
                );
            }
            None => log_event_at(
                Severity::Trace,
                Event::RequestRegistered,
                &[
                    ("caller", &caller_text),
                    ("target", &target_text),
                    ("tracker", &self.name),
                ],
            ),
        }
    }

    /// Remove the mailbox's pending entry if it still targets `target`.
    ///
    /// An entry registered through another mailbox sharing the same caller
    /// id is left alone.
    pub fn withdraw(&self, mailbox: &Mailbox, target: &LogPosition) -> bool {
        let caller = mailbox.id();
        let withdrawn = self
            .registry()
            .withdraw(caller, target, &mailbox.sender());
        if withdrawn {
            self.metrics.increment_requests_withdrawn();
            log_event_at(
                Severity::Trace,
                Event::RequestWithdrawn,
                &[
                    ("caller", &caller.to_string()),
                    ("target", &target.to_string()),
                    ("tracker", &self.name),
                ],
            );
        }
        withdrawn
    }

    /// Number of pending requests
    pub fn pending_count(&self) -> usize {
        self.registry().len()
    }

    /// Pending target of `caller`, if any.
    pub fn pending_target(&self, caller: CallerId) -> Option<LogPosition> {
        self.registry().target_of(caller)
    }

    /// Settle every pending request the cached position satisfies.
    ///
    /// Returns the number of notifications sent.
    pub fn evaluate_pending(&self) -> usize {
        let settlement = {
            let mut registry = self.registry();
            // Cache is read inside the registry lock.
            registry.settle(self.latest_local().as_ref())
        };

        let sent = settlement.notified.len();
        if sent > 0 {
            self.metrics.add_notifications_sent(sent as u64);
        }
        if settlement.pruned > 0 {
            self.metrics.add_requests_pruned(settlement.pruned as u64);
            log_event_at(
                Severity::Trace,
                Event::RequestPruned,
                &[
                    ("count", &settlement.pruned.to_string()),
                    ("tracker", &self.name),
                ],
            );
        }
        for notification in &settlement.notified {
            log_event_at(
                Severity::Trace,
                Event::NotificationSent,
                &[
                    ("caller", &notification.caller.to_string()),
                    ("target", &notification.target.to_string()),
                    ("tracker", &self.name),
                ],
            );
        }
        sent
    }

    // ---- waiting ----

    /// Block until the notification for `(mailbox, target)` arrives or
    /// `timeout` elapses.
    ///
    /// On timeout the caller's own entry is withdrawn. If it was already
    /// settled, the notification is sitting in the mailbox and the wait
    /// counts as ready.
    pub async fn await_notification(
        &self,
        mailbox: &mut Mailbox,
        target: LogPosition,
        timeout: Duration,
    ) -> WaitOutcome {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(timeout, mailbox.recv_matching(&target)).await {
            Ok(()) => WaitOutcome::Ready,
            Err(_) => {
                if !self.withdraw(mailbox, &target) && mailbox.take_matching(&target) {
                    WaitOutcome::Ready
                } else {
                    WaitOutcome::TimedOut
                }
            }
        };

        let elapsed_ms = started.elapsed().as_millis().to_string();
        let fields = [
            ("caller", mailbox.id().to_string()),
            ("elapsed_ms", elapsed_ms),
            ("target", target.to_string()),
            ("tracker", self.name.clone()),
        ];
        let fields: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        match outcome {
            WaitOutcome::Ready => {
                self.metrics.increment_waits_ready();
                log_event_at(Severity::Trace, Event::WaitReady, &fields);
            }
            WaitOutcome::TimedOut => {
                self.metrics.increment_waits_timed_out();
                log_event_at(Severity::Warn, Event::WaitTimedOut, &fields);
            }
        }
        outcome
    }

    /// Register and wait, skipping both when the target is already visible.
    pub async fn request_and_await(
        &self,
        mailbox: &mut Mailbox,
        target: LogPosition,
        timeout: Duration,
    ) -> WaitOutcome {
        if self.is_satisfied(&target) {
            self.metrics.increment_waits_fast_path();
            return WaitOutcome::Ready;
        }

        self.request_notification(mailbox, target);
        // Covers an update that landed between the check and the registration.
        self.evaluate_pending();
        self.await_notification(mailbox, target, timeout).await
    }

    /// [`request_and_await`](Self::request_and_await) with a one-off mailbox.
    pub async fn wait_for(&self, target: LogPosition, timeout: Duration) -> WaitOutcome {
        let mut mailbox = Mailbox::new();
        self.request_and_await(&mut mailbox, target, timeout).await
    }

    /// Point-in-time view of this tracker
    pub fn stats(&self) -> TrackerStats {
        let (pending, oldest) = {
            let registry = self.registry();
            (registry.len(), registry.oldest())
        };
        TrackerStats {
            name: self.name.clone(),
            latest: self.latest_local().map(|p| p.to_string()),
            pending,
            oldest_pending_ms: oldest.map(|o| o.age.as_millis() as u64),
            oldest_registered_at: oldest
                .map(|o| o.registered_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            metrics: self.metrics.snapshot(),
        }
    }
}

/// Serializable snapshot of a tracker
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStats {
    pub name: String,
    pub latest: Option<String>,
    pub pending: usize,
    pub oldest_pending_ms: Option<u64>,
    /// RFC 3339 registration time of the oldest pending entry
    pub oldest_registered_at: Option<String>,
    pub metrics: MetricsSnapshot,
}

//! Tracker metrics
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exact but not synchronized with each other

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one tracked store
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    positions_recorded: AtomicU64,
    requests_registered: AtomicU64,
    requests_replaced: AtomicU64,
    requests_withdrawn: AtomicU64,
    requests_pruned: AtomicU64,
    notifications_sent: AtomicU64,
    waits_fast_path: AtomicU64,
    waits_ready: AtomicU64,
    waits_timed_out: AtomicU64,
    polls: AtomicU64,
    poll_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment positions recorded
    pub fn increment_positions_recorded(&self) {
        self.positions_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment requests registered
    pub fn increment_requests_registered(&self) {
        self.requests_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment requests replaced
    pub fn increment_requests_replaced(&self) {
        self.requests_replaced.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment requests withdrawn
    pub fn increment_requests_withdrawn(&self) {
        self.requests_withdrawn.fetch_add(1, Ordering::Relaxed);
    }

    /// Add pruned requests
    pub fn add_requests_pruned(&self, count: u64) {
        self.requests_pruned.fetch_add(count, Ordering::Relaxed);
    }

    /// Add notifications sent
    pub fn add_notifications_sent(&self, count: u64) {
        self.notifications_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment fast-path waits
    pub fn increment_waits_fast_path(&self) {
        self.waits_fast_path.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment ready waits
    pub fn increment_waits_ready(&self) {
        self.waits_ready.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment timed-out waits
    pub fn increment_waits_timed_out(&self) {
        self.waits_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment long-poll queries issued
    pub fn increment_polls(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment failed long-poll queries
    pub fn increment_poll_failures(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get notifications sent
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// Take a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            positions_recorded: self.positions_recorded.load(Ordering::Relaxed),
            requests_registered: self.requests_registered.load(Ordering::Relaxed),
            requests_replaced: self.requests_replaced.load(Ordering::Relaxed),
            requests_withdrawn: self.requests_withdrawn.load(Ordering::Relaxed),
            requests_pruned: self.requests_pruned.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            waits_fast_path: self.waits_fast_path.load(Ordering::Relaxed),
            waits_ready: self.waits_ready.load(Ordering::Relaxed),
            waits_timed_out: self.waits_timed_out.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub positions_recorded: u64,
    pub requests_registered: u64,
    pub requests_replaced: u64,
    pub requests_withdrawn: u64,
    pub requests_pruned: u64,
    pub notifications_sent: u64,
    pub waits_fast_path: u64,
    pub waits_ready: u64,
    pub waits_timed_out: u64,
    pub polls: u64,
    pub poll_failures: u64,
}

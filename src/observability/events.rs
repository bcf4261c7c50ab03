//! Observable events
//!
//! Every log line the crate writes is named by one of these.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Tracker
    /// Tracker created for a store
    TrackerCreated,
    /// New local replay position cached
    PositionRecorded,
    /// Recorded position is older than the cached one
    PositionRegressed,
    /// Pending request registered
    RequestRegistered,
    /// Pending request replaced by a newer one from the same caller
    RequestReplaced,
    /// Timed-out waiter withdrew its own request
    RequestWithdrawn,
    /// Entry dropped because its mailbox is gone
    RequestPruned,
    /// Notification delivered to a waiter
    NotificationSent,
    /// Wait satisfied
    WaitReady,
    /// Wait exceeded its timeout
    WaitTimedOut,
    /// Safety-net sweeper started
    SweeperStart,
    /// Safety-net sweeper stopped
    SweeperStop,

    // Monitor
    /// Monitor loop started
    MonitorStart,
    /// Monitor not started: this instance is primary
    MonitorSkippedPrimary,
    /// Long-poll query failed, will retry
    MonitorPollFailed,
    /// Monitor loop stopped on request
    MonitorStop,
    /// Monitor loop hit a fatal error (FATAL)
    MonitorFatal,

    // Coordinator
    /// Operation executed locally on the primary
    CoordinatorLocal,
    /// Operation dispatched to the primary region
    CoordinatorRemote,
    /// Position capture failed, result returned without waiting
    CoordinatorFailOpen,
    /// Remote write visible locally
    CoordinatorReady,
    /// Remote write not visible within the replication timeout
    CoordinatorTimeout,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::TrackerCreated => "TRACKER_CREATED",
            Event::PositionRecorded => "POSITION_RECORDED",
            Event::PositionRegressed => "POSITION_REGRESSED",
            Event::RequestRegistered => "REQUEST_REGISTERED",
            Event::RequestReplaced => "REQUEST_REPLACED",
            Event::RequestWithdrawn => "REQUEST_WITHDRAWN",
            Event::RequestPruned => "REQUEST_PRUNED",
            Event::NotificationSent => "NOTIFICATION_SENT",
            Event::WaitReady => "WAIT_READY",
            Event::WaitTimedOut => "WAIT_TIMED_OUT",
            Event::SweeperStart => "SWEEPER_START",
            Event::SweeperStop => "SWEEPER_STOP",
            Event::MonitorStart => "MONITOR_START",
            Event::MonitorSkippedPrimary => "MONITOR_SKIPPED_PRIMARY",
            Event::MonitorPollFailed => "MONITOR_POLL_FAILED",
            Event::MonitorStop => "MONITOR_STOP",
            Event::MonitorFatal => "MONITOR_FATAL",
            Event::CoordinatorLocal => "COORDINATOR_LOCAL",
            Event::CoordinatorRemote => "COORDINATOR_REMOTE",
            Event::CoordinatorFailOpen => "COORDINATOR_FAIL_OPEN",
            Event::CoordinatorReady => "COORDINATOR_READY",
            Event::CoordinatorTimeout => "COORDINATOR_TIMEOUT",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Check if this event represents a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::MonitorFatal)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

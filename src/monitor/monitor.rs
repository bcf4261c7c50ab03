//! Replay Position Monitor
//!
//! Keeps exactly one long-poll query outstanding against the tracked store.
//! The server holds each query until the replay position moves past the
//! last known one or its timeout elapses; the monitor reissues immediately.
//! Query volume is therefore independent of how many callers are waiting.
//!
//! - Runs only outside the primary region (the primary has no lag)
//! - Query failures are logged and retried after a short jittered delay
//! - A malformed position report stops the loop

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::errors::{MonitorError, MonitorResult};
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity};
use crate::position::LogPosition;
use crate::region::RegionClassifier;
use crate::source::{ReplayCursor, ReplayReport, SourceError};
use crate::tracker::ReplicationTracker;

/// Monitor timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Server-side long-poll timeout
    pub poll_timeout: Duration,
    /// Pause after a failed query, before jitter
    pub retry_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl MonitorConfig {
    /// Client-side bound on one long poll.
    pub fn query_bound(&self) -> Duration {
        self.poll_timeout + self.retry_delay
    }

    fn jittered_retry_delay(&self) -> Duration {
        let base = self.retry_delay.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=base / 4);
        Duration::from_millis(base + jitter)
    }
}

/// Why a monitor loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// Instance is in the primary region; nothing to track
    SkippedPrimary,
    /// Shutdown requested
    Stopped,
}

/// Long-poll loop feeding one tracker
pub struct Monitor {
    tracker: Arc<ReplicationTracker>,
    classifier: Arc<dyn RegionClassifier>,
    config: MonitorConfig,
}

impl Monitor {
    /// Create a monitor for `tracker`'s store.
    pub fn new(
        tracker: Arc<ReplicationTracker>,
        classifier: Arc<dyn RegionClassifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            tracker,
            classifier,
            config,
        }
    }

    /// Tracker this monitor feeds
    pub fn tracker(&self) -> &Arc<ReplicationTracker> {
        &self.tracker
    }

    /// Issue one long poll and feed any new position to the tracker.
    ///
    /// Returns the observed position, or `None` if the poll timed out
    /// server-side without movement.
    pub async fn poll_once(&self) -> MonitorResult<Option<LogPosition>> {
        let cursor = ReplayCursor::from_position(self.tracker.latest_local().as_ref());
        self.tracker.metrics().increment_polls();

        let bound = self.config.query_bound();
        let query = self
            .tracker
            .source()
            .wait_for_replay(cursor, self.config.poll_timeout);
        let report = match tokio::time::timeout(bound, query).await {
            Ok(report) => report?,
            Err(_) => return Err(SourceError::Timeout(bound).into()),
        };

        match report {
            ReplayReport::Unchanged => Ok(None),
            ReplayReport::Advanced(text) => {
                let position = LogPosition::parse_replay(text.as_deref())?;
                self.tracker.observe(position);
                Ok(Some(position))
            }
        }
    }

    /// Run until shutdown, a fatal error, or immediately if primary.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) -> MonitorResult<MonitorExit> {
        let tracker_name = self.tracker.name().to_string();

        if self.classifier.is_primary_region() {
            log_event_with_fields(
                Event::MonitorSkippedPrimary,
                &[
                    ("region", self.classifier.primary_region()),
                    ("tracker", &tracker_name),
                ],
            );
            return Ok(MonitorExit::SkippedPrimary);
        }

        log_event_with_fields(
            Event::MonitorStart,
            &[
                ("poll_timeout_ms", &self.config.poll_timeout.as_millis().to_string()),
                ("tracker", &tracker_name),
            ],
        );

        loop {
            let result = tokio::select! {
                _ = &mut shutdown => break,
                result = self.poll_once() => result,
            };

            let error = match result {
                Ok(_) => continue,
                Err(error) => error,
            };

            if error.is_fatal() {
                log_event_with_fields(
                    Event::MonitorFatal,
                    &[("reason", &error.to_string()), ("tracker", &tracker_name)],
                );
                return Err(error);
            }

            self.tracker.metrics().increment_poll_failures();
            let delay = self.config.jittered_retry_delay();
            log_event_at(
                Severity::Warn,
                Event::MonitorPollFailed,
                &[
                    ("reason", &error.to_string()),
                    ("retry_ms", &delay.as_millis().to_string()),
                    ("tracker", &tracker_name),
                ],
            );
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        log_event_with_fields(Event::MonitorStop, &[("tracker", &tracker_name)]);
        Ok(MonitorExit::Stopped)
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let name = self.tracker.name().to_string();
        let task = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle {
            name,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Handle to a running monitor
///
/// Dropping the handle also stops the loop.
#[derive(Debug)]
pub struct MonitorHandle {
    name: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<MonitorResult<MonitorExit>>>,
}

impl MonitorHandle {
    /// Name of the tracker being fed
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the loop to stop after the current step.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Check if the loop has ended.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end.
    pub async fn join(mut self) -> MonitorResult<MonitorExit> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| MonitorError::Task(format!("monitor task panicked: {e}")))?,
            None => Ok(MonitorExit::Stopped),
        }
    }

    /// Signal shutdown and wait.
    pub async fn stop(mut self) -> MonitorResult<MonitorExit> {
        self.shutdown();
        self.join().await
    }
}

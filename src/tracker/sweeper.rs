//! Safety-net sweeper
//!
//! Re-runs `evaluate_pending` on a fixed interval, independent of the
//! monitor. Catches requests that were registered after the update that
//! satisfies them and whose own evaluation raced with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::tracker::ReplicationTracker;
use crate::observability::{log_event_with_fields, Event};

/// Handle to a running sweeper task
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stop and wait for the task to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ReplicationTracker {
    /// Spawn a task that evaluates pending requests every `interval`.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let tracker = Arc::clone(self);

        let task = tokio::spawn(async move {
            log_event_with_fields(
                Event::SweeperStart,
                &[
                    ("interval_ms", &interval.as_millis().to_string()),
                    ("tracker", tracker.name()),
                ],
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        tracker.evaluate_pending();
                    }
                }
            }
            log_event_with_fields(Event::SweeperStop, &[("tracker", tracker.name())]);
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

//! Remote-execute-and-wait coordinator
//!
//! Runs a write on the primary and returns only once the write is visible
//! on the local replica:
//! 1. In the primary region: execute locally, no hop, no wait.
//! 2. Otherwise: send the operation to the primary region, which executes
//!    it and captures its insert position in the same unit of work.
//! 3. Capture failed: fail open, return the result without waiting.
//! 4. Wait on the tracker for the captured position.
//! 5. Ready: return the result. Timed out: typed error, or abort.
//!
//! With `await_replication` off, steps 3 to 5 are skipped entirely.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use super::errors::{CoordinatorError, CoordinatorResult, TransportError};
use super::operation::{LocalExecutor, OperationDescriptor, PositionCapture, RemoteCall};
use super::options::{CallOptions, TimeoutPolicy};
use super::transport::RpcTransport;
use crate::observability::{log_event_at, Event, Severity};
use crate::position::LogPosition;
use crate::region::RegionClassifier;
use crate::tracker::{Mailbox, TrackerSet, WaitOutcome};

/// Routes writes to the primary and waits for local visibility
pub struct Coordinator {
    classifier: Arc<dyn RegionClassifier>,
    transport: Arc<dyn RpcTransport>,
    executor: Arc<dyn LocalExecutor>,
    trackers: TrackerSet,
    defaults: CallOptions,
}

impl Coordinator {
    /// Create a coordinator.
    ///
    /// `executor` runs operations when this instance is itself primary.
    pub fn new(
        classifier: Arc<dyn RegionClassifier>,
        transport: Arc<dyn RpcTransport>,
        executor: Arc<dyn LocalExecutor>,
        trackers: TrackerSet,
    ) -> Self {
        Self {
            classifier,
            transport,
            executor,
            trackers,
            defaults: CallOptions::default(),
        }
    }

    /// Replace the options used by [`execute`](Self::execute).
    pub fn with_defaults(mut self, defaults: CallOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Options used by [`execute`](Self::execute)
    pub fn defaults(&self) -> &CallOptions {
        &self.defaults
    }

    /// Trackers available to callers
    pub fn trackers(&self) -> &TrackerSet {
        &self.trackers
    }

    /// Run `operation` with the default options.
    pub async fn execute(&self, operation: &OperationDescriptor) -> CoordinatorResult<Value> {
        self.execute_with(operation, &self.defaults).await
    }

    /// Run `operation` on the primary and wait until it is locally visible.
    ///
    /// # Panics
    ///
    /// With [`TimeoutPolicy::Abort`], panics when the write is not visible
    /// within the replication timeout.
    pub async fn execute_with(
        &self,
        operation: &OperationDescriptor,
        options: &CallOptions,
    ) -> CoordinatorResult<Value> {
        if self.classifier.is_primary_region() {
            log_event_at(
                Severity::Trace,
                Event::CoordinatorLocal,
                &[("operation", &operation.name)],
            );
            return Ok(self.executor.execute(operation).await?);
        }

        // Resolve before dispatching so a bad name never leaves an unawaited write.
        let tracker = if options.await_replication {
            Some(self.trackers.get(options.tracker.as_deref())?)
        } else {
            None
        };

        let started = Instant::now();
        let region = self.classifier.primary_region();
        log_event_at(
            Severity::Trace,
            Event::CoordinatorRemote,
            &[("operation", &operation.name), ("region", region)],
        );

        let call = RemoteCall {
            operation: operation.clone(),
            capture_position: options.await_replication,
            tracker: tracker.as_ref().map(|t| t.name().to_string()),
        };
        let reply = tokio::time::timeout(
            options.rpc_timeout,
            self.transport.call_in_region(region, call, options.rpc_timeout),
        )
        .await
        .map_err(|_| TransportError::Timeout(options.rpc_timeout))??;

        let Some(tracker) = tracker else {
            return Ok(reply.result);
        };

        let target = match reply.position {
            PositionCapture::Captured(text) => LogPosition::parse_insert(&text)?,
            PositionCapture::LookupFailed(reason) => {
                log_event_at(
                    Severity::Warn,
                    Event::CoordinatorFailOpen,
                    &[
                        ("operation", &operation.name),
                        ("reason", &reason),
                        ("tracker", tracker.name()),
                    ],
                );
                return Ok(reply.result);
            }
            PositionCapture::NotRequested => {
                log_event_at(
                    Severity::Warn,
                    Event::CoordinatorFailOpen,
                    &[
                        ("operation", &operation.name),
                        ("reason", "remote returned no position"),
                        ("tracker", tracker.name()),
                    ],
                );
                return Ok(reply.result);
            }
        };

        let mut mailbox = Mailbox::new();
        let outcome = tracker
            .request_and_await(&mut mailbox, target, options.replication_timeout)
            .await;
        let elapsed = started.elapsed();

        match outcome {
            WaitOutcome::Ready => {
                log_event_at(
                    Severity::Trace,
                    Event::CoordinatorReady,
                    &[
                        ("elapsed_ms", &elapsed.as_millis().to_string()),
                        ("operation", &operation.name),
                        ("target", &target.to_string()),
                    ],
                );
                Ok(reply.result)
            }
            WaitOutcome::TimedOut => {
                log_event_at(
                    Severity::Error,
                    Event::CoordinatorTimeout,
                    &[
                        ("elapsed_ms", &elapsed.as_millis().to_string()),
                        ("operation", &operation.name),
                        ("policy", options.on_timeout.as_str()),
                        ("target", &target.to_string()),
                        ("tracker", tracker.name()),
                    ],
                );
                match options.on_timeout {
                    TimeoutPolicy::ReturnError => Err(CoordinatorError::ReplicationTimeout {
                        operation: operation.name.clone(),
                        elapsed,
                    }),
                    TimeoutPolicy::Abort => panic!(
                        "operation {} not replicated to {} after {}ms",
                        operation.name,
                        tracker.name(),
                        elapsed.as_millis()
                    ),
                }
            }
        }
    }
}

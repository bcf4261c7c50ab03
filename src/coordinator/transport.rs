//! RPC transport seam
//!
//! The transport carries a [`RemoteCall`] to a node in another region and
//! brings back its [`RemoteReply`]. Each call is at-most-once from the
//! coordinator's point of view; retries belong to the transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::errors::TransportError;
use super::operation::{execute_and_capture, LocalExecutor, RemoteCall, RemoteReply};
use crate::source::{BoxFuture, ReplicationSource};

/// Carries calls to another region
pub trait RpcTransport: Send + Sync {
    /// Run `call` on a node in `region`, bounded by `timeout`.
    fn call_in_region<'a>(
        &'a self,
        region: &'a str,
        call: RemoteCall,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<RemoteReply, TransportError>>;
}

/// In-process transport that plays the primary node
///
/// Runs the remote unit of work directly against an executor and the
/// stores' query handles. Used for tests and single-process simulation.
pub struct LoopbackTransport {
    executor: Arc<dyn LocalExecutor>,
    default_source: Arc<dyn ReplicationSource>,
    sources: HashMap<String, Arc<dyn ReplicationSource>>,
    latency: Duration,
    failure: Mutex<Option<TransportError>>,
    calls: AtomicU64,
}

impl LoopbackTransport {
    /// Create a loopback transport capturing from `default_source`.
    pub fn new(executor: Arc<dyn LocalExecutor>, default_source: Arc<dyn ReplicationSource>) -> Self {
        Self {
            executor,
            default_source,
            sources: HashMap::new(),
            latency: Duration::ZERO,
            failure: Mutex::new(None),
            calls: AtomicU64::new(0),
        }
    }

    /// Capture from `source` for calls naming `tracker`.
    pub fn with_source(mut self, tracker: impl Into<String>, source: Arc<dyn ReplicationSource>) -> Self {
        self.sources.insert(tracker.into(), source);
        self
    }

    /// Simulated network delay per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every call with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<TransportError>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Calls received
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn source_for(&self, tracker: Option<&str>) -> &dyn ReplicationSource {
        tracker
            .and_then(|name| self.sources.get(name))
            .unwrap_or(&self.default_source)
            .as_ref()
    }

    async fn serve(&self, call: RemoteCall) -> Result<RemoteReply, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let source = self.source_for(call.tracker.as_deref());
        execute_and_capture(self.executor.as_ref(), source, &call)
            .await
            .map_err(|e| TransportError::Remote(e.to_string()))
    }
}

impl RpcTransport for LoopbackTransport {
    fn call_in_region<'a>(
        &'a self,
        _region: &'a str,
        call: RemoteCall,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<RemoteReply, TransportError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let failure = self
                .failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(error) = failure {
                return Err(error);
            }

            tokio::time::timeout(timeout, self.serve(call))
                .await
                .map_err(|_| TransportError::Timeout(timeout))?
        })
    }
}

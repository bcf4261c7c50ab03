//! Operations and the remote unit of work
//!
//! An operation descriptor is opaque here: a name for logs and a JSON
//! payload for whichever executor runs it. On the primary, the remote side
//! runs the operation and then captures the store's insert position in the
//! same unit of work, so the position covers the write just made.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::OperationError;
use crate::source::{BoxFuture, ReplicationSource};

/// What to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Operation name, used in logs and errors
    pub name: String,
    /// Executor-specific arguments
    #[serde(default)]
    pub payload: Value,
}

impl OperationDescriptor {
    /// Create a new descriptor.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Runs operations against the store this process can write to
pub trait LocalExecutor: Send + Sync {
    /// Execute `operation`, returning its result.
    fn execute<'a>(
        &'a self,
        operation: &'a OperationDescriptor,
    ) -> BoxFuture<'a, Result<Value, OperationError>>;
}

/// Executor backed by a closure
pub struct FnExecutor<F>(F);

/// Wrap a synchronous closure as a [`LocalExecutor`].
pub fn executor_fn<F>(f: F) -> FnExecutor<F>
where
    F: Fn(&OperationDescriptor) -> Result<Value, OperationError> + Send + Sync,
{
    FnExecutor(f)
}

impl<F> LocalExecutor for FnExecutor<F>
where
    F: Fn(&OperationDescriptor) -> Result<Value, OperationError> + Send + Sync,
{
    fn execute<'a>(
        &'a self,
        operation: &'a OperationDescriptor,
    ) -> BoxFuture<'a, Result<Value, OperationError>> {
        let result = (self.0)(operation);
        Box::pin(std::future::ready(result))
    }
}

/// Request carried to the primary region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCall {
    pub operation: OperationDescriptor,
    /// Capture the insert position after executing
    pub capture_position: bool,
    /// Store whose position to capture; `None` for the default
    #[serde(default)]
    pub tracker: Option<String>,
}

/// Insert position captured by the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum PositionCapture {
    /// Position text as reported by the database
    Captured(String),
    /// Lookup query failed; reason attached
    LookupFailed(String),
    /// Caller did not ask for a position
    NotRequested,
}

/// Answer from the primary region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReply {
    pub position: PositionCapture,
    pub result: Value,
}

/// Remote unit of work: run the operation, then capture the insert position.
///
/// A failed lookup is reported in the reply rather than failing the call;
/// the write already happened.
pub async fn execute_and_capture(
    executor: &dyn LocalExecutor,
    source: &dyn ReplicationSource,
    call: &RemoteCall,
) -> Result<RemoteReply, OperationError> {
    let result = executor.execute(&call.operation).await?;

    let position = if call.capture_position {
        match source.insert_position().await {
            Ok(text) => PositionCapture::Captured(text),
            Err(e) => PositionCapture::LookupFailed(e.to_string()),
        }
    } else {
        PositionCapture::NotRequested
    };

    Ok(RemoteReply { position, result })
}

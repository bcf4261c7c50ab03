//! Coordinator Subsystem
//!
//! Routes writes to the primary region and returns only once they are
//! visible on the local replica.

mod errors;
mod operation;
mod options;
mod transport;

#[allow(clippy::module_inception)]
mod coordinator;

pub use coordinator::Coordinator;
pub use errors::{CoordinatorError, CoordinatorResult, OperationError, TransportError};
pub use operation::{
    execute_and_capture, executor_fn, FnExecutor, LocalExecutor, OperationDescriptor,
    PositionCapture, RemoteCall, RemoteReply,
};
pub use options::{CallOptions, TimeoutPolicy};
pub use transport::{LoopbackTransport, RpcTransport};

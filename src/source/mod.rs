//! Tracked Store Queries
//!
//! The database query interface the tracker and monitor consume, plus an
//! in-memory store for tests and simulation.

mod errors;
mod memory;
mod query;

pub use errors::{SourceError, SourceResult};
pub use memory::InMemorySource;
pub use query::{BoxFuture, ReplayCursor, ReplayReport, ReplicationSource};

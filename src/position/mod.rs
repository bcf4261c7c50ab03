//! Log Positions
//!
//! The value type used to decide "has this write replicated yet":
//! - Parsed from the database's `<hex-segment>/<hex-offset>` reports
//! - Totally ordered within one store, segment major
//! - Malformed reports fail fast

mod errors;
mod lsn;

pub use errors::{PositionError, PositionResult};
pub use lsn::{satisfied, LogPosition, Lsn, Origin};

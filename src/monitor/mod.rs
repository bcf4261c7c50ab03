//! Replay Position Monitoring
//!
//! Discovers new local replay positions with one outstanding long poll
//! per tracked store and feeds them into the tracker.

mod errors;
#[allow(clippy::module_inception)]
mod monitor;

pub use errors::{MonitorError, MonitorResult};
pub use monitor::{Monitor, MonitorConfig, MonitorExit, MonitorHandle};

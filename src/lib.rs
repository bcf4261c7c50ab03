//! lsnwait - read-your-writes across regions by waiting on log positions
//!
//! A write sent to the primary region comes back with the log position
//! it produced. The local replica is then watched until its replay
//! position reaches that target, so the caller's next local read sees
//! the write.
//!
//! - `position`: log positions and the satisfaction comparator
//! - `tracker`: cached local position, pending requests, notifications
//! - `source`: the database queries a tracker runs against its store
//! - `monitor`: one long-poll loop per tracker feeding fresh positions
//! - `coordinator`: execute remotely, capture the position, wait locally
//! - `region`: primary-region classification
//! - `config`: JSON configuration file
//! - `observability`: structured logging and counters
//! - `cli`: command line

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod monitor;
pub mod observability;
pub mod position;
pub mod region;
pub mod source;
pub mod tracker;

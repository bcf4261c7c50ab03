//! CLI module for lsnwait
//!
//! Provides command-line interface for:
//! - validate: Load and check a configuration file
//! - compare: Evaluate one position against another
//! - simulate: Run coordinated writes against an in-memory replica

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    compare, compare_positions, run, run_command, run_simulation, simulate, validate, Comparison,
    SimulationReport,
};
pub use errors::{CliError, CliErrorCode, CliResult};

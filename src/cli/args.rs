//! CLI argument definitions using clap
//!
//! Commands:
//! - lsnwait validate --config <path>
//! - lsnwait compare <local> <target>
//! - lsnwait simulate --config <path> [--waiters N] [--lag-ms M]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lsnwait - read-your-writes across regions by waiting on log positions
#[derive(Parser, Debug)]
#[command(name = "lsnwait")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./lsnwait.json")]
        config: PathBuf,
    },

    /// Check whether a local replay position satisfies a target
    Compare {
        /// Local replay position (`X/Y`, or `not_replicating`)
        local: String,

        /// Target insert position (`X/Y`)
        target: String,
    },

    /// Run an in-memory replica with concurrent coordinated writes
    Simulate {
        /// Path to configuration file
        #[arg(long, default_value = "./lsnwait.json")]
        config: PathBuf,

        /// Concurrent writers
        #[arg(long, default_value_t = 8)]
        waiters: usize,

        /// Replication lag of the in-memory replica
        #[arg(long, default_value_t = 50)]
        lag_ms: u64,

        /// Emit trace-level lifecycle logs
        #[arg(long)]
        verbose: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

//! CLI command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;

use crate::config::Config;
use crate::coordinator::{
    executor_fn, Coordinator, CoordinatorError, LocalExecutor, LoopbackTransport,
    OperationDescriptor,
};
use crate::monitor::Monitor;
use crate::observability::{Logger, Severity};
use crate::position::{satisfied, LogPosition, Origin};
use crate::region::RegionClassifier;
use crate::source::InMemorySource;
use crate::tracker::{ReplicationTracker, TrackerSet, TrackerStats};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Bytes of WAL each simulated write appends
const SIMULATED_WRITE_BYTES: u64 = 64;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Validate { config } => validate(&config),
        Command::Compare { local, target } => compare(&local, &target),
        Command::Simulate {
            config,
            waiters,
            lag_ms,
            verbose,
        } => simulate(&config, waiters, Duration::from_millis(lag_ms), verbose),
    }
}

/// Load and validate a configuration file, printing the effective settings.
pub fn validate(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    write_json(&json!({
        "status": "ok",
        "primary": config.is_primary(),
        "config": config,
    }))
}

/// Outcome of a position comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub local: String,
    pub target: String,
    pub satisfied: bool,
}

/// Compare a local replay position against a target insert position.
pub fn compare_positions(local: &str, target: &str) -> CliResult<Comparison> {
    let local_text = match local.trim() {
        "not_replicating" | "null" => None,
        text => Some(text),
    };
    let local = LogPosition::parse(local_text, Origin::Replay)?;
    let target = LogPosition::parse_insert(target)?;

    Ok(Comparison {
        local: local.to_string(),
        target: target.to_string(),
        satisfied: satisfied(&local, &target),
    })
}

/// Print whether `local` satisfies `target`.
pub fn compare(local: &str, target: &str) -> CliResult<()> {
    write_json(&compare_positions(local, target)?)
}

/// Result of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub region: String,
    pub primary: bool,
    pub waiters: usize,
    pub lag_ms: u64,
    pub ready: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub aborted: usize,
    pub elapsed_ms: u64,
    pub trackers: Vec<TrackerStats>,
}

/// Run `waiters` coordinated writes against an in-memory replica lagging by `lag`.
pub fn simulate(config_path: &Path, waiters: usize, lag: Duration, verbose: bool) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(if verbose {
        Severity::Trace
    } else {
        Severity::Error
    });

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_error(format!("Failed to create tokio runtime: {}", e)))?;
    let report = rt.block_on(run_simulation(&config, waiters, lag))?;
    write_json(&report)
}

/// Drive one simulation on the current runtime.
pub async fn run_simulation(
    config: &Config,
    waiters: usize,
    lag: Duration,
) -> CliResult<SimulationReport> {
    let classifier: Arc<dyn RegionClassifier> = Arc::new(config.classifier());

    let mut sources = Vec::new();
    let mut trackers = Vec::new();
    for name in &config.trackers {
        let source = Arc::new(InMemorySource::with_check_interval(Duration::from_millis(5)));
        trackers.push(Arc::new(ReplicationTracker::new(name.clone(), source.clone())));
        sources.push((name.clone(), source));
    }
    let set = TrackerSet::new(config.default_tracker.clone(), trackers.iter().cloned())
        .map_err(|e| CliError::config_error(e.to_string()))?;

    // Writes land on the default tracker's store.
    let default_source = sources
        .iter()
        .find(|(name, _)| *name == config.default_tracker)
        .map(|(_, source)| Arc::clone(source))
        .ok_or_else(|| CliError::config_error("default tracker has no store"))?;
    let writer = Arc::clone(&default_source);
    let executor: Arc<dyn LocalExecutor> = Arc::new(executor_fn(move |op| {
        let bytes = op.payload["bytes"].as_u64().unwrap_or(SIMULATED_WRITE_BYTES);
        Ok(json!({ "written": writer.write(bytes).to_string() }))
    }));
    let mut transport = LoopbackTransport::new(Arc::clone(&executor), default_source.clone());
    for (name, source) in &sources {
        transport = transport.with_source(name.clone(), source.clone());
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let replicators: Vec<_> = sources
        .iter()
        .map(|(_, source)| tokio::spawn(replicate(Arc::clone(source), lag, stop_rx.clone())))
        .collect();

    let monitor_config = config.monitor_config();
    let monitors: Vec<_> = trackers
        .iter()
        .map(|tracker| {
            Monitor::new(Arc::clone(tracker), Arc::clone(&classifier), monitor_config).spawn()
        })
        .collect();
    let sweepers: Vec<_> = trackers
        .iter()
        .map(|tracker| tracker.spawn_sweeper(config.sweep_interval()))
        .collect();

    let coordinator = Arc::new(
        Coordinator::new(classifier, Arc::new(transport), executor, set)
            .with_defaults(config.call_options()),
    );

    let started = Instant::now();
    let tasks = (0..waiters).map(|i| {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let op = OperationDescriptor::new(
                format!("write-{}", i),
                json!({ "bytes": SIMULATED_WRITE_BYTES }),
            );
            coordinator.execute(&op).await
        })
    });
    let results = join_all(tasks).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let mut report = SimulationReport {
        region: config.region.clone(),
        primary: config.is_primary(),
        waiters,
        lag_ms: lag.as_millis() as u64,
        ready: 0,
        timed_out: 0,
        failed: 0,
        aborted: 0,
        elapsed_ms,
        trackers: Vec::new(),
    };
    for result in results {
        match result {
            Ok(Ok(_)) => report.ready += 1,
            Ok(Err(CoordinatorError::ReplicationTimeout { .. })) => report.timed_out += 1,
            Ok(Err(_)) => report.failed += 1,
            Err(_) => report.aborted += 1,
        }
    }

    for monitor in monitors {
        monitor
            .stop()
            .await
            .map_err(|e| CliError::runtime_error(e.to_string()))?;
    }
    for sweeper in sweepers {
        sweeper.stop().await;
    }
    let _ = stop_tx.send(true);
    for replicator in replicators {
        let _ = replicator.await;
    }

    report.trackers = coordinator.trackers().stats();
    Ok(report)
}

/// Replays whatever was written `lag` ago, until told to stop.
async fn replicate(
    source: Arc<InMemorySource>,
    lag: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let step = lag.max(Duration::from_millis(1));
    loop {
        let written = source.insert_lsn();
        tokio::select! {
            _ = tokio::time::sleep(step) => source.replay_to(written),
            _ = stop.changed() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_satisfied() {
        let result = compare_positions("0/20", "0/10").unwrap();
        assert!(result.satisfied);
        assert_eq!(result.local, "0/20");
    }

    #[test]
    fn test_compare_not_satisfied() {
        let result = compare_positions("0/8", "1/0").unwrap();
        assert!(!result.satisfied);
    }

    #[test]
    fn test_compare_not_replicating() {
        let result = compare_positions("not_replicating", "FF/FF").unwrap();
        assert!(result.satisfied);
        assert_eq!(result.local, "not_replicating");
    }

    #[test]
    fn test_compare_malformed() {
        let err = compare_positions("zz", "0/1").unwrap_err();
        assert_eq!(err.code_str(), "LSNWAIT_CLI_INVALID_POSITION");
    }

    #[tokio::test]
    async fn test_simulation_all_ready() {
        let mut config = Config::new("eu-west", "us-east");
        config.monitor.poll_timeout_ms = 100;
        config.monitor.retry_delay_ms = 10;
        config.monitor.sweep_interval_ms = 20;
        config.coordinator.replication_timeout_ms = 2000;

        let report = run_simulation(&config, 4, Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(report.ready, 4);
        assert_eq!(report.timed_out, 0);
        assert!(!report.primary);
        assert_eq!(report.trackers.len(), 1);
        assert_eq!(report.trackers[0].pending, 0);
    }

    #[tokio::test]
    async fn test_simulation_on_primary() {
        let config = Config::new("us-east", "us-east");
        let report = run_simulation(&config, 3, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(report.primary);
        assert_eq!(report.ready, 3);
        assert_eq!(report.trackers[0].metrics.requests_registered, 0);
    }
}

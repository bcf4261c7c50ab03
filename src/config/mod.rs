//! Configuration
//!
//! A single JSON file describes where this instance runs, which stores it
//! tracks, and the timing of the monitor and coordinator. Everything except
//! the two region names has a default.
//!
//! ```json
//! {
//!   "region": "eu-west",
//!   "primary_region": "us-east",
//!   "trackers": ["main"],
//!   "default_tracker": "main",
//!   "monitor": { "poll_timeout_ms": 5000, "retry_delay_ms": 1000, "sweep_interval_ms": 250 },
//!   "coordinator": { "rpc_timeout_ms": 5000, "replication_timeout_ms": 10000,
//!                    "await_replication": true, "on_timeout": "error" }
//! }
//! ```

mod errors;

pub use errors::{ConfigError, ConfigResult};

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinator::{CallOptions, TimeoutPolicy};
use crate::monitor::MonitorConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::region::StaticRegionClassifier;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Region this instance runs in (required)
    pub region: String,

    /// Region holding the primary database (required)
    pub primary_region: String,

    /// Tracked stores, by name (default: `["main"]`)
    #[serde(default = "default_trackers")]
    pub trackers: Vec<String>,

    /// Tracker used when a call names none (default: `"main"`)
    #[serde(default = "default_tracker")]
    pub default_tracker: String,

    #[serde(default)]
    pub monitor: MonitorSection,

    #[serde(default)]
    pub coordinator: CoordinatorSection,
}

/// `monitor` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSection {
    /// Server-side long-poll timeout (default 5s)
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Delay after a failed poll (default 1s)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Safety-net re-evaluation interval (default 250ms)
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

/// `coordinator` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorSection {
    /// Bound on the remote leg (default 5s)
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// Bound on the visibility wait (default 10s)
    #[serde(default = "default_replication_timeout_ms")]
    pub replication_timeout_ms: u64,

    /// Wait for local visibility (default true)
    #[serde(default = "default_await_replication")]
    pub await_replication: bool,

    /// "error" or "abort" (default "error")
    #[serde(default = "default_on_timeout")]
    pub on_timeout: String,
}

fn default_trackers() -> Vec<String> {
    vec![default_tracker()]
}
fn default_tracker() -> String {
    "main".to_string()
}
fn default_poll_timeout_ms() -> u64 {
    5000
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_sweep_interval_ms() -> u64 {
    250
}
fn default_rpc_timeout_ms() -> u64 {
    5000
}
fn default_replication_timeout_ms() -> u64 {
    10000
}
fn default_await_replication() -> bool {
    true
}
fn default_on_timeout() -> String {
    "error".to_string()
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            rpc_timeout_ms: default_rpc_timeout_ms(),
            replication_timeout_ms: default_replication_timeout_ms(),
            await_replication: default_await_replication(),
            on_timeout: default_on_timeout(),
        }
    }
}

impl Config {
    /// Config with defaults for everything but the regions.
    pub fn new(region: impl Into<String>, primary_region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            primary_region: primary_region.into(),
            trackers: default_trackers(),
            default_tracker: default_tracker(),
            monitor: MonitorSection::default(),
            coordinator: CoordinatorSection::default(),
        }
    }

    /// Load and validate configuration from file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json(&content)?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("primary", if config.is_primary() { "true" } else { "false" }),
                ("region", &config.region),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region must not be empty".into()));
        }
        if self.primary_region.trim().is_empty() {
            return Err(ConfigError::Invalid("primary_region must not be empty".into()));
        }

        if self.trackers.is_empty() {
            return Err(ConfigError::Invalid("at least one tracker is required".into()));
        }
        let mut seen = HashSet::new();
        for name in &self.trackers {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("tracker names must not be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate tracker '{}'", name)));
            }
        }
        if !seen.contains(self.default_tracker.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "default_tracker '{}' is not among trackers",
                self.default_tracker
            )));
        }

        let durations = [
            ("monitor.poll_timeout_ms", self.monitor.poll_timeout_ms),
            ("monitor.retry_delay_ms", self.monitor.retry_delay_ms),
            ("monitor.sweep_interval_ms", self.monitor.sweep_interval_ms),
            ("coordinator.rpc_timeout_ms", self.coordinator.rpc_timeout_ms),
            (
                "coordinator.replication_timeout_ms",
                self.coordinator.replication_timeout_ms,
            ),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be > 0", field)));
            }
        }

        if TimeoutPolicy::from_name(&self.coordinator.on_timeout).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Invalid on_timeout: '{}'. Must be 'error' or 'abort'.",
                self.coordinator.on_timeout
            )));
        }

        Ok(())
    }

    /// Check if this instance runs in the primary region.
    pub fn is_primary(&self) -> bool {
        self.region == self.primary_region
    }

    /// Region classifier fixed by this configuration
    pub fn classifier(&self) -> StaticRegionClassifier {
        StaticRegionClassifier::new(self.region.clone(), self.primary_region.clone())
    }

    /// Monitor timing
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_timeout: Duration::from_millis(self.monitor.poll_timeout_ms),
            retry_delay: Duration::from_millis(self.monitor.retry_delay_ms),
        }
    }

    /// Sweeper interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.sweep_interval_ms)
    }

    /// Default options for coordinated calls
    pub fn call_options(&self) -> CallOptions {
        let section = &self.coordinator;
        CallOptions {
            rpc_timeout: Duration::from_millis(section.rpc_timeout_ms),
            replication_timeout: Duration::from_millis(section.replication_timeout_ms),
            tracker: None,
            await_replication: section.await_replication,
            on_timeout: TimeoutPolicy::from_name(&section.on_timeout).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionClassifier;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config =
            Config::from_json(r#"{"region": "eu-west", "primary_region": "us-east"}"#).unwrap();
        assert_eq!(config, Config::new("eu-west", "us-east"));
        assert_eq!(config.trackers, vec!["main".to_string()]);
        assert_eq!(config.monitor.poll_timeout_ms, 5000);
        assert_eq!(config.coordinator.on_timeout, "error");
        assert!(!config.is_primary());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"{
                "region": "us-east",
                "primary_region": "us-east",
                "trackers": ["main", "audit"],
                "default_tracker": "audit",
                "monitor": { "poll_timeout_ms": 200 },
                "coordinator": { "on_timeout": "abort", "await_replication": false }
            }"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert!(config.is_primary());
        assert_eq!(config.default_tracker, "audit");
        assert_eq!(config.monitor.poll_timeout_ms, 200);
        assert_eq!(config.monitor.retry_delay_ms, 1000);

        let options = config.call_options();
        assert_eq!(options.on_timeout, TimeoutPolicy::Abort);
        assert!(!options.await_replication);
        assert_eq!(options.replication_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/lsnwait.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_region_rejected() {
        let err = Config::from_json(r#"{"primary_region": "us-east"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_region_rejected() {
        let err = Config::from_json(r#"{"region": " ", "primary_region": "us-east"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_tracker_validation() {
        let mut config = Config::new("eu-west", "us-east");
        config.trackers.clear();
        assert!(config.validate().is_err());

        config.trackers = vec!["main".into(), "main".into()];
        assert!(config.validate().is_err());

        config.trackers = vec!["main".into(), "audit".into()];
        config.default_tracker = "billing".into();
        assert!(config.validate().is_err());

        config.default_tracker = "audit".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut config = Config::new("eu-west", "us-east");
        config.monitor.sweep_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid config: monitor.sweep_interval_ms must be > 0"
        );
    }

    #[test]
    fn test_unknown_timeout_policy_rejected() {
        let mut config = Config::new("eu-west", "us-east");
        config.coordinator.on_timeout = "retry".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_components() {
        let config = Config::new("eu-west", "us-east");
        let classifier = config.classifier();
        assert!(!classifier.is_primary_region());
        assert_eq!(classifier.primary_region(), "us-east");

        let monitor = config.monitor_config();
        assert_eq!(monitor.poll_timeout, Duration::from_secs(5));
        assert_eq!(monitor.query_bound(), Duration::from_secs(6));
        assert_eq!(config.sweep_interval(), Duration::from_millis(250));
    }
}

//! Per-call options

use std::time::Duration;

/// What to do when a write is not visible within the replication timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Return `CoordinatorError::ReplicationTimeout`
    #[default]
    ReturnError,
    /// Panic the calling task
    Abort,
}

impl TimeoutPolicy {
    /// Parse the configuration spelling (`error` / `abort`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "error" => Some(Self::ReturnError),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }

    /// Returns the configuration spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReturnError => "error",
            Self::Abort => "abort",
        }
    }
}

/// Options for one coordinated call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Bound on the remote execution leg
    pub rpc_timeout: Duration,
    /// Bound on the local visibility wait
    pub replication_timeout: Duration,
    /// Tracker to wait on; `None` for the default
    pub tracker: Option<String>,
    /// Wait for local visibility at all
    pub await_replication: bool,
    /// Behavior on replication timeout
    pub on_timeout: TimeoutPolicy,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(5),
            replication_timeout: Duration::from_secs(10),
            tracker: None,
            await_replication: true,
            on_timeout: TimeoutPolicy::ReturnError,
        }
    }
}

impl CallOptions {
    /// Set the RPC timeout.
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Set the replication timeout.
    pub fn replication_timeout(mut self, timeout: Duration) -> Self {
        self.replication_timeout = timeout;
        self
    }

    /// Wait on a named tracker.
    pub fn tracker(mut self, name: impl Into<String>) -> Self {
        self.tracker = Some(name.into());
        self
    }

    /// Return as soon as the remote result is in.
    pub fn no_await(mut self) -> Self {
        self.await_replication = false;
        self
    }

    /// Set the timeout policy.
    pub fn on_timeout(mut self, policy: TimeoutPolicy) -> Self {
        self.on_timeout = policy;
        self
    }
}

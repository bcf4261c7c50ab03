//! Named trackers
//!
//! One process may track several stores at once; callers pick one by name
//! or fall back to the default.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{TrackerError, TrackerResult};
use super::tracker::{ReplicationTracker, TrackerStats};

/// Trackers keyed by name, with a default
#[derive(Debug, Clone)]
pub struct TrackerSet {
    default_name: String,
    trackers: HashMap<String, Arc<ReplicationTracker>>,
}

impl TrackerSet {
    /// Build a set; `default_name` must be one of the trackers.
    pub fn new(
        default_name: impl Into<String>,
        trackers: impl IntoIterator<Item = Arc<ReplicationTracker>>,
    ) -> TrackerResult<Self> {
        let default_name = default_name.into();
        let mut by_name = HashMap::new();
        for tracker in trackers {
            let name = tracker.name().to_string();
            if by_name.insert(name.clone(), tracker).is_some() {
                return Err(TrackerError::DuplicateTracker(name));
            }
        }

        if by_name.is_empty() {
            return Err(TrackerError::NoTrackers);
        }
        if !by_name.contains_key(&default_name) {
            return Err(TrackerError::UnknownTracker(default_name));
        }

        Ok(Self {
            default_name,
            trackers: by_name,
        })
    }

    /// Set holding a single tracker, which is also the default.
    pub fn single(tracker: Arc<ReplicationTracker>) -> Self {
        let default_name = tracker.name().to_string();
        let mut trackers = HashMap::new();
        trackers.insert(default_name.clone(), tracker);
        Self {
            default_name,
            trackers,
        }
    }

    /// Tracker by name, or the default when `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> TrackerResult<Arc<ReplicationTracker>> {
        let name = name.unwrap_or(&self.default_name);
        self.trackers
            .get(name)
            .cloned()
            .ok_or_else(|| TrackerError::UnknownTracker(name.to_string()))
    }

    /// Default tracker
    pub fn default_tracker(&self) -> Arc<ReplicationTracker> {
        // Presence checked at construction
        Arc::clone(&self.trackers[&self.default_name])
    }

    /// Name of the default tracker
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// All trackers
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ReplicationTracker>> {
        self.trackers.values()
    }

    /// Tracker names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trackers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Stats for every tracker, sorted by name
    pub fn stats(&self) -> Vec<TrackerStats> {
        let mut stats: Vec<TrackerStats> = self.iter().map(|t| t.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    fn tracker(name: &str) -> Arc<ReplicationTracker> {
        Arc::new(ReplicationTracker::new(name, Arc::new(InMemorySource::new())))
    }

    #[test]
    fn test_get_by_name_and_default() {
        let set = TrackerSet::new("main", [tracker("main"), tracker("audit")]).unwrap();
        assert_eq!(set.get(None).unwrap().name(), "main");
        assert_eq!(set.get(Some("audit")).unwrap().name(), "audit");
        assert_eq!(set.default_tracker().name(), "main");
        assert_eq!(set.names(), vec!["audit", "main"]);
    }

    #[test]
    fn test_unknown_name() {
        let set = TrackerSet::single(tracker("main"));
        assert_eq!(
            set.get(Some("other")).unwrap_err(),
            TrackerError::UnknownTracker("other".to_string())
        );
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            TrackerSet::new("main", Vec::new()).unwrap_err(),
            TrackerError::NoTrackers
        );
        assert_eq!(
            TrackerSet::new("main", [tracker("main"), tracker("main")]).unwrap_err(),
            TrackerError::DuplicateTracker("main".to_string())
        );
        assert_eq!(
            TrackerSet::new("main", [tracker("audit")]).unwrap_err(),
            TrackerError::UnknownTracker("main".to_string())
        );
    }
}

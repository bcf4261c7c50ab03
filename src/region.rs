//! Region classification
//!
//! "Am I in the primary region?" is an external fact. The monitor uses it
//! as a gate and the coordinator as its routing decision.

/// External answer to where the primary lives
pub trait RegionClassifier: Send + Sync {
    /// Check if this instance runs in the primary region.
    fn is_primary_region(&self) -> bool;

    /// Name of the primary region, the target of remote calls.
    fn primary_region(&self) -> &str;
}

/// Classifier fixed at startup from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRegionClassifier {
    local_region: String,
    primary_region: String,
}

impl StaticRegionClassifier {
    /// Create a classifier from the local and primary region names.
    pub fn new(local_region: impl Into<String>, primary_region: impl Into<String>) -> Self {
        Self {
            local_region: local_region.into(),
            primary_region: primary_region.into(),
        }
    }

    /// Local region name
    pub fn local_region(&self) -> &str {
        &self.local_region
    }
}

impl RegionClassifier for StaticRegionClassifier {
    fn is_primary_region(&self) -> bool {
        self.local_region == self.primary_region
    }

    fn primary_region(&self) -> &str {
        &self.primary_region
    }
}

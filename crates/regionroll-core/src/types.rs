//! Shared domain types: regions and rollout plans.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A deployment target that runs exactly one version at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Unique label, also the compose service name (e.g. `region-us-west`).
    pub name: String,
    /// `host:port` of the region's service.
    pub endpoint: String,
    /// Version the controller believes is live in this region.
    pub current_version: String,
}

impl Region {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            current_version: current_version.into(),
        }
    }
}

/// Errors raised while assembling a [`RolloutPlan`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("target version must not be empty")]
    EmptyTargetVersion,

    #[error("previous version must not be empty")]
    EmptyPreviousVersion,

    #[error("duplicate region in plan: {0}")]
    DuplicateRegion(String),

    #[error("failure simulation rate must be within 0.0..=1.0, got {0}")]
    InvalidFailureRate(f64),
}

/// An immutable description of one rollout invocation.
///
/// Region order is the deployment order; reversed, it is the rollback order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolloutPlan {
    regions: Vec<Region>,
    target_version: String,
    previous_version: String,
    failure_simulation_rate: Option<f64>,
}

impl RolloutPlan {
    /// Build a plan, rejecting empty versions and duplicate region names.
    pub fn new(
        regions: Vec<Region>,
        target_version: impl Into<String>,
        previous_version: impl Into<String>,
    ) -> Result<Self, PlanError> {
        let target_version = target_version.into();
        let previous_version = previous_version.into();

        if target_version.trim().is_empty() {
            return Err(PlanError::EmptyTargetVersion);
        }
        if previous_version.trim().is_empty() {
            return Err(PlanError::EmptyPreviousVersion);
        }

        let mut seen = HashSet::new();
        for region in &regions {
            if !seen.insert(region.name.as_str()) {
                return Err(PlanError::DuplicateRegion(region.name.clone()));
            }
        }

        Ok(Self {
            regions,
            target_version,
            previous_version,
            failure_simulation_rate: None,
        })
    }

    /// Attach a failure simulation rate, forwarded untouched to the region service.
    pub fn with_failure_rate(mut self, rate: f64) -> Result<Self, PlanError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(PlanError::InvalidFailureRate(rate));
        }
        self.failure_simulation_rate = Some(rate);
        Ok(self)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    pub fn previous_version(&self) -> &str {
        &self.previous_version
    }

    pub fn failure_simulation_rate(&self) -> Option<f64> {
        self.failure_simulation_rate
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(names: &[&str]) -> Vec<Region> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Region::new(*n, format!("127.0.0.1:{}", 8081 + i), "v1"))
            .collect()
    }

    #[test]
    fn plan_keeps_region_order() {
        let plan = RolloutPlan::new(regions(&["us-west", "us-east", "eu-west"]), "v2", "v1").unwrap();
        let names: Vec<_> = plan.regions().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["us-west", "us-east", "eu-west"]);
        assert_eq!(plan.target_version(), "v2");
        assert_eq!(plan.previous_version(), "v1");
        assert_eq!(plan.failure_simulation_rate(), None);
    }

    #[test]
    fn plan_rejects_duplicate_regions() {
        let err = RolloutPlan::new(regions(&["us-west", "us-west"]), "v2", "v1").unwrap_err();
        assert_eq!(err, PlanError::DuplicateRegion("us-west".to_string()));
    }

    #[test]
    fn plan_rejects_empty_versions() {
        assert_eq!(
            RolloutPlan::new(vec![], " ", "v1").unwrap_err(),
            PlanError::EmptyTargetVersion
        );
        assert_eq!(
            RolloutPlan::new(vec![], "v2", "").unwrap_err(),
            PlanError::EmptyPreviousVersion
        );
    }

    #[test]
    fn empty_plan_is_allowed() {
        let plan = RolloutPlan::new(vec![], "v2", "v1").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn failure_rate_must_be_a_probability() {
        let plan = RolloutPlan::new(regions(&["us-west"]), "v3", "v1").unwrap();
        assert_eq!(
            plan.clone().with_failure_rate(1.5).unwrap_err(),
            PlanError::InvalidFailureRate(1.5)
        );
        let plan = plan.with_failure_rate(0.8).unwrap();
        assert_eq!(plan.failure_simulation_rate(), Some(0.8));
    }

    #[test]
    fn region_serializes_with_current_version() {
        let region = Region::new("us-west", "127.0.0.1:8081", "v1");
        let json = serde_json::to_value(&region).unwrap();
        assert_eq!(json["current_version"], "v1");
    }
}

//! The container orchestrator seam.

use regionroll_core::Region;
use regionroll_health::BoxFuture;

use crate::error::DeployError;

/// What a region should run after a deploy.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeploySpec {
    pub version: String,
    /// Exported to the region service as `FAILURE_RATE`.
    pub failure_rate: f64,
}

impl DeploySpec {
    pub fn new(version: impl Into<String>, failure_rate: f64) -> Self {
        Self {
            version: version.into(),
            failure_rate,
        }
    }
}

/// Brings a region's service instance to a requested version.
///
/// Deploys must be idempotent: asking for the version a region already runs
/// leaves it running that version.
pub trait ContainerOrchestrator: Send + Sync {
    fn deploy<'a>(&'a self, region: &'a Region, spec: &'a DeploySpec) -> BoxFuture<'a, Result<(), DeployError>>;
}

//! The region-facing side of a health probe.

use std::future::Future;
use std::pin::Pin;

use regionroll_core::Region;

use crate::error::ProbeError;

/// Boxed, sendable future used by the object-safe traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a region's health endpoint said, when it could be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthReport {
    Healthy,
    /// Reachable but not serving correctly; carries the service's detail.
    Unhealthy(String),
}

/// Body of the region service's `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceInfo {
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub region: String,
}

/// A region that can report its running version and its health.
///
/// Implemented over HTTP by [`crate::HttpRegionClient`]; tests substitute
/// scripted implementations.
pub trait RegionTarget: Send + Sync {
    /// Ask the region which version it is running.
    fn running_version<'a>(&'a self, region: &'a Region) -> BoxFuture<'a, Result<String, ProbeError>>;

    /// Query the region's health endpoint once.
    fn health<'a>(&'a self, region: &'a Region) -> BoxFuture<'a, Result<HealthReport, ProbeError>>;
}

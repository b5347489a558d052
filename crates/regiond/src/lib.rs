//! regiond — the service instance each region runs.
//!
//! A region reports which version it runs and whether it is healthy. The
//! health endpoint fails with a configured probability so rollouts can be
//! driven into their rollback paths.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | `{status, version, region}` |
//! | GET | `/health` | 200 healthy / 503 simulated failure |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod metrics;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

/// Per-instance settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ServiceConfig {
    pub version: String,
    pub region: String,
    /// Probability in `0.0..=1.0` that a health check reports unhealthy.
    pub failure_rate: f64,
}

impl ServiceConfig {
    /// Create a config; the failure rate is clamped into `0.0..=1.0`.
    pub fn new(version: impl Into<String>, region: impl Into<String>, failure_rate: f64) -> Self {
        let failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self {
            version: version.into(),
            region: region.into(),
            failure_rate,
        }
    }
}

/// Shared state for the handlers.
pub type ServiceState = Arc<ServiceConfig>;

/// Build the service router.
pub fn build_router(config: ServiceConfig) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(Arc::new(config))
}

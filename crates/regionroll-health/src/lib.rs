//! regionroll-health — verifying that a region runs the expected version
//! and reports healthy.
//!
//! # Architecture
//!
//! ```text
//! HealthProbe
//!   ├── RegionTarget (trait)
//!   │   └── HttpRegionClient: GET / (version), GET /health
//!   └── Sleeper (trait)
//!       └── TokioSleeper
//! ```
//!
//! `HealthProbe::verify` checks the reported version first, then polls
//! health with a fixed retry delay until one check passes or the attempt
//! budget runs out. Both seams are traits so the retry loop can be driven
//! by scripted targets and a sleeper that never actually waits.

pub mod client;
pub mod error;
pub mod probe;
pub mod target;

pub use client::HttpRegionClient;
pub use error::ProbeError;
pub use probe::{HealthProbe, Sleeper, TokioSleeper, VerificationResult};
pub use target::{BoxFuture, HealthReport, RegionTarget, ServiceInfo};

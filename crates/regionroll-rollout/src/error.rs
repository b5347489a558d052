//! Rollout error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The orchestrator could not bring a region to a version.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DeployError {
    #[error("failed to launch `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("orchestrator rejected {region}: {reason}")]
    Rejected { region: String, reason: String },
}

/// Why a region failed during the forward rollout.
///
/// Every variant is recovered the same way: by rolling back.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("deploy failed: {0}")]
    Deploy(DeployError),

    #[error("version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("health check failed after {attempts} attempts: {last_error}")]
    HealthCheck { attempts: u32, last_error: String },

    #[error("canary soak failed on check {check}: {last_error}")]
    CanaryFailed { check: u32, last_error: String },
}

/// A rollback deploy that did not complete. Leaves the fleet on mixed
/// versions and needs an operator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("rollback of {region} to {version} failed: {error}")]
pub struct RollbackStepError {
    pub region: String,
    pub version: String,
    #[source]
    pub error: DeployError,
}

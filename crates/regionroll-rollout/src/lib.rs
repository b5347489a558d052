//! regionroll-rollout — progressive multi-region rollouts with automatic
//! rollback.
//!
//! The controller upgrades regions strictly one at a time. Each region is
//! deployed, then verified; the first failure stops the rollout and reverts
//! the failed region plus every region already upgraded, newest first.
//!
//! # Components
//!
//! - **`orchestrator`** — the `ContainerOrchestrator` seam (`deploy` only)
//! - **`compose`** — `docker compose` implementation of the orchestrator
//! - **`controller`** — the rollout state machine
//! - **`report`** — attempt records and the terminal `RolloutReport`
//! - **`error`** — deploy, verification, and rollback failure types

pub mod compose;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod report;

pub use compose::ComposeOrchestrator;
pub use controller::{CanaryOptions, ControllerState, RolloutController, RolloutOptions};
pub use error::{DeployError, FailureReason, RollbackStepError};
pub use orchestrator::{ContainerOrchestrator, DeploySpec};
pub use report::{AttemptOutcome, FailedRegion, FinalStatus, RolloutAttempt, RolloutReport, format_report};

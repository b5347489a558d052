//! Rollout controller — drives regions through deploy and verify, and
//! rolls back on the first failure.
//!
//! Regions are processed strictly one at a time. A failed region stops
//! the rollout: the failed region is reverted first, then every region
//! already verified, newest first. Regions after the failure are never
//! touched. Rollback is best-effort: a failed revert is recorded and the
//! sweep carries on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use regionroll_core::{Region, RolloutPlan};
use regionroll_health::{HealthProbe, VerificationResult};

use crate::error::{FailureReason, RollbackStepError};
use crate::orchestrator::{ContainerOrchestrator, DeploySpec};
use crate::report::{AttemptOutcome, ReportBuilder, RolloutAttempt, RolloutReport};

/// Where the controller is in its run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ControllerState {
    /// Not started.
    Idle,
    /// Deploying the target version to a region.
    Deploying { region: String },
    /// Waiting for a region's version and health checks.
    Verifying { region: String },
    /// The last region verified; moving on.
    Advancing,
    /// Reverting regions after a failure.
    RollingBack,
    /// Every region verified.
    Completed,
    /// Failure handled; every revert succeeded.
    RolledBack,
    /// Failure handled; at least one revert failed.
    RollbackFailed,
}

/// Tuning for region verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutOptions {
    /// Health attempts per region.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub retry_delay: Duration,
    /// Extra soak checks on the first region, if any.
    pub canary: Option<CanaryOptions>,
}

impl Default for RolloutOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            canary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanaryOptions {
    pub checks: u32,
    pub interval: Duration,
}

/// A single rollout run.
///
/// The controller owns its copy of the regions and is the only writer of
/// `Region::current_version`. [`RolloutController::run`] consumes the
/// controller, so each run yields exactly one report.
pub struct RolloutController {
    plan: RolloutPlan,
    regions: Vec<Region>,
    attempts: Vec<RolloutAttempt>,
    orchestrator: Arc<dyn ContainerOrchestrator>,
    probe: HealthProbe,
    options: RolloutOptions,
    state: ControllerState,
}

impl RolloutController {
    pub fn new(
        plan: RolloutPlan,
        orchestrator: Arc<dyn ContainerOrchestrator>,
        probe: HealthProbe,
        options: RolloutOptions,
    ) -> Self {
        let regions = plan.regions().to_vec();
        let attempts = regions
            .iter()
            .map(|r| RolloutAttempt::pending(&r.name))
            .collect();
        Self {
            plan,
            regions,
            attempts,
            orchestrator,
            probe,
            options,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// The controller's current view of every region.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Run the rollout to completion or through rollback.
    pub async fn run(mut self) -> RolloutReport {
        let mut report = ReportBuilder::new(&self.plan);
        let mut verified: Vec<usize> = Vec::new();

        info!(
            target_version = %self.plan.target_version(),
            previous_version = %self.plan.previous_version(),
            regions = self.regions.len(),
            "starting rollout"
        );

        for index in 0..self.regions.len() {
            match self.advance_region(index).await {
                Ok(()) => {
                    report.succeeded(&self.regions[index].name);
                    verified.push(index);
                }
                Err(reason) => {
                    let name = self.regions[index].name.clone();
                    error!(region = %name, %reason, "region failed, rolling back");
                    report.failed(&name, reason);
                    self.rollback(index, &verified, &mut report).await;
                    return self.finish(report);
                }
            }
        }

        self.transition(ControllerState::Completed);
        info!(version = %self.plan.target_version(), "rollout complete");
        self.finish(report)
    }

    /// Deploy and verify one region.
    async fn advance_region(&mut self, index: usize) -> Result<(), FailureReason> {
        let region = self.regions[index].clone();
        let target = self.plan.target_version().to_string();
        let spec = DeploySpec::new(&target, self.plan.failure_simulation_rate().unwrap_or(0.0));

        self.transition(ControllerState::Deploying {
            region: region.name.clone(),
        });
        info!(region = %region.name, version = %target, "deploying");

        if let Err(e) = self.orchestrator.deploy(&region, &spec).await {
            self.mark_failed(index, e.to_string());
            return Err(FailureReason::Deploy(e));
        }
        self.attempts[index].outcome = AttemptOutcome::Deployed;

        self.transition(ControllerState::Verifying {
            region: region.name.clone(),
        });
        let verdict = self
            .probe
            .verify(
                &region,
                &target,
                self.options.max_attempts,
                self.options.retry_delay,
            )
            .await;

        match verdict {
            VerificationResult::Healthy { attempts } => {
                self.attempts[index].retry_count = attempts.saturating_sub(1);
            }
            VerificationResult::Unhealthy {
                attempts,
                last_error,
            } => {
                self.attempts[index].retry_count = attempts.saturating_sub(1);
                self.mark_failed(index, last_error.clone());
                return Err(FailureReason::HealthCheck {
                    attempts,
                    last_error,
                });
            }
            VerificationResult::VersionMismatch { expected, actual } => {
                let reason = FailureReason::VersionMismatch { expected, actual };
                self.mark_failed(index, reason.to_string());
                return Err(reason);
            }
        }

        if index == 0 {
            if let Some(canary) = self.options.canary.clone().filter(|c| c.checks > 0) {
                info!(region = %region.name, checks = canary.checks, "canary soak");
                if let VerificationResult::Unhealthy {
                    attempts,
                    last_error,
                } = self.probe.soak(&region, canary.checks, canary.interval).await
                {
                    self.mark_failed(index, last_error.clone());
                    return Err(FailureReason::CanaryFailed {
                        check: attempts,
                        last_error,
                    });
                }
                info!(region = %region.name, "canary soak passed");
            }
        }

        self.attempts[index].outcome = AttemptOutcome::HealthVerified;
        self.regions[index].current_version = target;
        self.transition(ControllerState::Advancing);
        info!(region = %region.name, "region verified");
        Ok(())
    }

    /// Revert the failed region, then the verified ones newest first.
    ///
    /// Each region gets exactly one revert call. The failed region's
    /// attempt keeps its `HealthFailed` outcome.
    async fn rollback(&mut self, failed: usize, verified: &[usize], report: &mut ReportBuilder) {
        self.transition(ControllerState::RollingBack);
        let previous = self.plan.previous_version().to_string();
        // Simulated failures stay off while restoring the stable version.
        let spec = DeploySpec::new(&previous, 0.0);

        warn!(
            version = %previous,
            regions = verified.len() + 1,
            "initiating automatic rollback"
        );

        let mut clean = true;
        let order = std::iter::once(failed).chain(verified.iter().rev().copied());
        for index in order {
            let region = self.regions[index].clone();
            info!(region = %region.name, version = %previous, "rolling back");

            match self.orchestrator.deploy(&region, &spec).await {
                Ok(()) => {
                    self.regions[index].current_version = previous.clone();
                    if index != failed {
                        self.attempts[index].outcome = AttemptOutcome::RolledBack;
                    }
                    report.rolled_back(&region.name);
                    info!(region = %region.name, "rolled back");
                }
                Err(e) => {
                    error!(region = %region.name, error = %e, "rollback step failed");
                    clean = false;
                    self.attempts[index].last_error = Some(format!("rollback failed: {e}"));
                    report.rollback_failed(RollbackStepError {
                        region: region.name.clone(),
                        version: previous.clone(),
                        error: e,
                    });
                }
            }
        }

        if clean {
            self.transition(ControllerState::RolledBack);
            warn!(version = %previous, "rollout rolled back");
        } else {
            self.transition(ControllerState::RollbackFailed);
            error!("rollback incomplete, manual intervention required");
        }
    }

    fn finish(self, report: ReportBuilder) -> RolloutReport {
        report.finish(self.attempts, self.regions)
    }

    fn mark_failed(&mut self, index: usize, error: String) {
        self.attempts[index].outcome = AttemptOutcome::HealthFailed;
        self.attempts[index].last_error = Some(error);
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "controller state");
        self.state = next;
    }
}

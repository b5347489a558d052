//! Attempt records, the terminal rollout report, and its text rendering.

use serde::{Deserialize, Serialize};

use regionroll_core::{Region, RolloutPlan};

use crate::error::{FailureReason, RollbackStepError};

/// Where a single region got to during the rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Pending,
    Deployed,
    HealthVerified,
    HealthFailed,
    RolledBack,
}

/// Per-region progress, owned and mutated only by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutAttempt {
    pub region: String,
    pub outcome: AttemptOutcome,
    /// Health attempts beyond the first.
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl RolloutAttempt {
    pub fn pending(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            outcome: AttemptOutcome::Pending,
            retry_count: 0,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalStatus {
    /// Every region verified at the target version.
    Success,
    /// A region failed and every revert succeeded.
    RolledBack,
    /// At least one revert failed; regions are on mixed versions.
    RollbackFailed,
}

impl FinalStatus {
    /// Process exit code. 2 is left to argument errors.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::RolledBack => 1,
            Self::RollbackFailed => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::RolledBack => "ROLLED BACK",
            Self::RollbackFailed => "ROLLBACK FAILED",
        }
    }
}

/// The region whose deploy or verification stopped the rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRegion {
    pub region: String,
    pub reason: FailureReason,
}

/// Terminal summary of a rollout. Produced once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutReport {
    pub target_version: String,
    pub previous_version: String,
    /// Regions that reached `HealthVerified`, in plan order.
    pub succeeded_regions: Vec<String>,
    pub failed_region: Option<FailedRegion>,
    /// Regions reverted, in the order the revert calls were made.
    pub rolled_back_regions: Vec<String>,
    pub rollback_failures: Vec<RollbackStepError>,
    pub attempts: Vec<RolloutAttempt>,
    /// The controller's view of every region once the rollout ended.
    pub final_versions: Vec<Region>,
    pub final_status: FinalStatus,
}

impl RolloutReport {
    pub fn exit_code(&self) -> i32 {
        self.final_status.exit_code()
    }

    /// Regions whose revert did not complete.
    pub fn inconsistent_regions(&self) -> Vec<&str> {
        self.rollback_failures.iter().map(|f| f.region.as_str()).collect()
    }
}

/// Collects rollout events and assembles the [`RolloutReport`].
///
/// Pure aggregation: the final status is derived from what was recorded.
#[derive(Debug)]
pub struct ReportBuilder {
    target_version: String,
    previous_version: String,
    succeeded: Vec<String>,
    failed: Option<FailedRegion>,
    rolled_back: Vec<String>,
    rollback_failures: Vec<RollbackStepError>,
}

impl ReportBuilder {
    pub fn new(plan: &RolloutPlan) -> Self {
        Self {
            target_version: plan.target_version().to_string(),
            previous_version: plan.previous_version().to_string(),
            succeeded: Vec::new(),
            failed: None,
            rolled_back: Vec::new(),
            rollback_failures: Vec::new(),
        }
    }

    pub fn succeeded(&mut self, region: &str) {
        self.succeeded.push(region.to_string());
    }

    pub fn failed(&mut self, region: &str, reason: FailureReason) {
        self.failed = Some(FailedRegion {
            region: region.to_string(),
            reason,
        });
    }

    pub fn rolled_back(&mut self, region: &str) {
        self.rolled_back.push(region.to_string());
    }

    pub fn rollback_failed(&mut self, error: RollbackStepError) {
        self.rollback_failures.push(error);
    }

    pub fn finish(self, attempts: Vec<RolloutAttempt>, final_versions: Vec<Region>) -> RolloutReport {
        let final_status = if !self.rollback_failures.is_empty() {
            FinalStatus::RollbackFailed
        } else if self.failed.is_some() {
            FinalStatus::RolledBack
        } else {
            FinalStatus::Success
        };

        RolloutReport {
            target_version: self.target_version,
            previous_version: self.previous_version,
            succeeded_regions: self.succeeded,
            failed_region: self.failed,
            rolled_back_regions: self.rolled_back,
            rollback_failures: self.rollback_failures,
            attempts,
            final_versions,
            final_status,
        }
    }
}

/// Human-readable report.
pub fn format_report(report: &RolloutReport) -> String {
    let mut out = String::new();

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Multi-Region Rollout Report             ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Target:   {:<30}║\n", report.target_version));
    out.push_str(&format!("║  Previous: {:<30}║\n", report.previous_version));
    out.push_str(&format!("║  Status:   {:<30}║\n", report.final_status.label()));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    if report.succeeded_regions.is_empty() {
        out.push_str("Verified regions: none\n");
    } else {
        out.push_str(&format!(
            "Verified regions: {}\n",
            report.succeeded_regions.join(", ")
        ));
    }

    if let Some(failed) = &report.failed_region {
        out.push_str(&format!("\n❌ FAILED: {}\n", failed.region));
        out.push_str(&format!("   Reason: {}\n", failed.reason));
    }

    if !report.rolled_back_regions.is_empty() {
        out.push_str(&format!(
            "\n🔄 Rolled back to {}: {}\n",
            report.previous_version,
            report.rolled_back_regions.join(", ")
        ));
    }

    if !report.rollback_failures.is_empty() {
        out.push_str("\n⚠️  ROLLBACK INCOMPLETE — manual intervention required:\n\n");
        for f in &report.rollback_failures {
            out.push_str(&format!("  • {}: {}\n", f.region, f.error));
        }
    }

    out.push_str("\nRegion versions:\n");
    for region in &report.final_versions {
        out.push_str(&format!("  {:<20} {}\n", region.name, region.current_version));
    }

    if report.final_status == FinalStatus::Success {
        out.push_str("\n✅ Deployment complete!\n");
    }

    out
}

//! Health verification with bounded retries.
//!
//! A verification confirms the running version once, then polls the
//! health endpoint at a fixed interval until a check passes or the
//! attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use regionroll_core::Region;

use crate::target::{BoxFuture, HealthReport, RegionTarget};

/// Outcome of verifying one region.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VerificationResult {
    /// Version matched and a health check passed on attempt `attempts`.
    Healthy { attempts: u32 },
    /// Every attempt failed; `last_error` is the final failure seen.
    Unhealthy { attempts: u32, last_error: String },
    /// The region is running something other than what was deployed.
    VersionMismatch { expected: String, actual: String },
}

impl VerificationResult {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Waits between retries. Swapped out in tests so retry loops run instantly.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Verifies regions through a [`RegionTarget`].
#[derive(Clone)]
pub struct HealthProbe {
    target: Arc<dyn RegionTarget>,
    sleeper: Arc<dyn Sleeper>,
}

impl HealthProbe {
    pub fn new(target: Arc<dyn RegionTarget>) -> Self {
        Self {
            target,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Verify that `region` runs `expected_version` and reports healthy.
    ///
    /// An unreachable version endpoint uses up an attempt just like a failed
    /// health check. A reachable endpoint reporting the wrong version ends
    /// the verification immediately. No sleep follows the last attempt.
    pub async fn verify(
        &self,
        region: &Region,
        expected_version: &str,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> VerificationResult {
        let max_attempts = max_attempts.max(1);
        let mut version_confirmed = false;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if !version_confirmed {
                match self.target.running_version(region).await {
                    Ok(actual) if actual == expected_version => {
                        debug!(region = %region.name, version = %actual, "running version confirmed");
                        version_confirmed = true;
                    }
                    Ok(actual) => {
                        warn!(
                            region = %region.name,
                            expected = %expected_version,
                            %actual,
                            "version mismatch"
                        );
                        return VerificationResult::VersionMismatch {
                            expected: expected_version.to_string(),
                            actual,
                        };
                    }
                    Err(e) => {
                        warn!(region = %region.name, attempt, error = %e, "could not read running version");
                        last_error = e.to_string();
                    }
                }
            }

            if version_confirmed {
                match self.target.health(region).await {
                    Ok(HealthReport::Healthy) => {
                        info!(region = %region.name, attempt, "health check passed");
                        return VerificationResult::Healthy { attempts: attempt };
                    }
                    Ok(HealthReport::Unhealthy(detail)) => {
                        warn!(region = %region.name, attempt, %detail, "health check reported unhealthy");
                        last_error = format!("unhealthy: {detail}");
                    }
                    Err(e) => {
                        warn!(region = %region.name, attempt, error = %e, "health check unreachable");
                        last_error = e.to_string();
                    }
                }
            }

            if attempt < max_attempts {
                self.sleeper.sleep(retry_delay).await;
            }
        }

        VerificationResult::Unhealthy {
            attempts: max_attempts,
            last_error,
        }
    }

    /// Run `checks` single health queries, waiting `interval` before each.
    ///
    /// The first failing check ends the soak with `Unhealthy`, where
    /// `attempts` is the index of that check.
    pub async fn soak(&self, region: &Region, checks: u32, interval: Duration) -> VerificationResult {
        for check in 1..=checks {
            self.sleeper.sleep(interval).await;
            let failure = match self.target.health(region).await {
                Ok(HealthReport::Healthy) => {
                    debug!(region = %region.name, check, "soak check passed");
                    continue;
                }
                Ok(HealthReport::Unhealthy(detail)) => format!("unhealthy: {detail}"),
                Err(e) => e.to_string(),
            };
            warn!(region = %region.name, check, error = %failure, "soak check failed");
            return VerificationResult::Unhealthy {
                attempts: check,
                last_error: failure,
            };
        }
        VerificationResult::Healthy { attempts: checks }
    }

    /// Read the version a region is currently running.
    pub async fn running_version(&self, region: &Region) -> Result<String, crate::ProbeError> {
        self.target.running_version(region).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::error::ProbeError;

    /// Replays scripted answers; once a script runs dry the last answer repeats.
    struct ScriptedTarget {
        versions: Mutex<VecDeque<Result<String, ProbeError>>>,
        health: Mutex<VecDeque<Result<HealthReport, ProbeError>>>,
        version_calls: Mutex<u32>,
        health_calls: Mutex<u32>,
    }

    impl ScriptedTarget {
        fn new(
            versions: Vec<Result<String, ProbeError>>,
            health: Vec<Result<HealthReport, ProbeError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                versions: Mutex::new(versions.into()),
                health: Mutex::new(health.into()),
                version_calls: Mutex::new(0),
                health_calls: Mutex::new(0),
            })
        }

        fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> T {
            let mut q = queue.lock().unwrap();
            if q.len() > 1 {
                q.pop_front().unwrap()
            } else {
                q.front().cloned().unwrap()
            }
        }

        fn health_calls(&self) -> u32 {
            *self.health_calls.lock().unwrap()
        }

        fn version_calls(&self) -> u32 {
            *self.version_calls.lock().unwrap()
        }
    }

    impl RegionTarget for ScriptedTarget {
        fn running_version<'a>(&'a self, _region: &'a Region) -> BoxFuture<'a, Result<String, ProbeError>> {
            *self.version_calls.lock().unwrap() += 1;
            let answer = Self::next(&self.versions);
            Box::pin(async move { answer })
        }

        fn health<'a>(&'a self, _region: &'a Region) -> BoxFuture<'a, Result<HealthReport, ProbeError>> {
            *self.health_calls.lock().unwrap() += 1;
            let answer = Self::next(&self.health);
            Box::pin(async move { answer })
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
            self.sleeps.lock().unwrap().push(duration);
            Box::pin(async {})
        }
    }

    fn region() -> Region {
        Region::new("us-west", "127.0.0.1:8081", "v1")
    }

    fn refused() -> ProbeError {
        ProbeError::Connect {
            address: "127.0.0.1:8081".to_string(),
            reason: "connection refused".to_string(),
        }
    }

    fn probe(target: Arc<ScriptedTarget>, sleeper: Arc<RecordingSleeper>) -> HealthProbe {
        HealthProbe::new(target).with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn healthy_on_first_attempt() {
        let target = ScriptedTarget::new(vec![Ok("v2".into())], vec![Ok(HealthReport::Healthy)]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper.clone())
            .verify(&region(), "v2", 3, Duration::from_secs(2))
            .await;

        assert_eq!(result, VerificationResult::Healthy { attempts: 1 });
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
        assert_eq!(target.health_calls(), 1);
    }

    #[tokio::test]
    async fn recovers_within_budget() {
        let target = ScriptedTarget::new(
            vec![Ok("v2".into())],
            vec![
                Ok(HealthReport::Unhealthy("simulated failure".into())),
                Err(refused()),
                Ok(HealthReport::Healthy),
            ],
        );
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper.clone())
            .verify(&region(), "v2", 3, Duration::from_secs(2))
            .await;

        assert_eq!(result, VerificationResult::Healthy { attempts: 3 });
        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(2); 2]);
        // The version is only read once.
        assert_eq!(target.version_calls(), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_with_fixed_delay() {
        let target = ScriptedTarget::new(
            vec![Ok("v3".into())],
            vec![Ok(HealthReport::Unhealthy("simulated failure".into()))],
        );
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper.clone())
            .verify(&region(), "v3", 4, Duration::from_millis(500))
            .await;

        assert_eq!(
            result,
            VerificationResult::Unhealthy {
                attempts: 4,
                last_error: "unhealthy: simulated failure".to_string(),
            }
        );
        assert_eq!(target.health_calls(), 4);
        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_millis(500); 3]);
    }

    #[tokio::test]
    async fn version_mismatch_skips_health_checks() {
        let target = ScriptedTarget::new(vec![Ok("v1".into())], vec![Ok(HealthReport::Healthy)]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper.clone())
            .verify(&region(), "v2", 3, Duration::from_secs(2))
            .await;

        assert_eq!(
            result,
            VerificationResult::VersionMismatch {
                expected: "v2".to_string(),
                actual: "v1".to_string(),
            }
        );
        assert_eq!(target.health_calls(), 0);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_version_endpoint_consumes_attempts() {
        let target = ScriptedTarget::new(
            vec![Err(refused()), Ok("v2".into())],
            vec![Ok(HealthReport::Healthy)],
        );
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper.clone())
            .verify(&region(), "v2", 3, Duration::from_secs(1))
            .await;

        assert_eq!(result, VerificationResult::Healthy { attempts: 2 });
        assert_eq!(target.health_calls(), 1);
    }

    #[tokio::test]
    async fn unreachable_region_reports_last_error() {
        let target = ScriptedTarget::new(vec![Err(refused())], vec![Ok(HealthReport::Healthy)]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper)
            .verify(&region(), "v2", 2, Duration::from_secs(1))
            .await;

        match result {
            VerificationResult::Unhealthy { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("expected Unhealthy, got {other:?}"),
        }
        assert_eq!(target.health_calls(), 0);
    }

    #[tokio::test]
    async fn zero_attempts_still_probes_once() {
        let target = ScriptedTarget::new(vec![Ok("v2".into())], vec![Ok(HealthReport::Healthy)]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target, sleeper).verify(&region(), "v2", 0, Duration::ZERO).await;
        assert_eq!(result, VerificationResult::Healthy { attempts: 1 });
    }

    #[tokio::test]
    async fn soak_passes_when_every_check_is_healthy() {
        let target = ScriptedTarget::new(vec![Ok("v2".into())], vec![Ok(HealthReport::Healthy)]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper.clone())
            .soak(&region(), 5, Duration::from_secs(2))
            .await;

        assert_eq!(result, VerificationResult::Healthy { attempts: 5 });
        assert_eq!(target.health_calls(), 5);
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn soak_stops_at_first_failure() {
        let target = ScriptedTarget::new(
            vec![Ok("v2".into())],
            vec![
                Ok(HealthReport::Healthy),
                Ok(HealthReport::Unhealthy("simulated failure".into())),
                Ok(HealthReport::Healthy),
            ],
        );
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = probe(target.clone(), sleeper).soak(&region(), 5, Duration::from_secs(2)).await;

        assert_eq!(
            result,
            VerificationResult::Unhealthy {
                attempts: 2,
                last_error: "unhealthy: simulated failure".to_string(),
            }
        );
        assert_eq!(target.health_calls(), 2);
    }
}

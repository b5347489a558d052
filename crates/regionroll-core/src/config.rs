//! regions.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::types::{PlanError, Region, RolloutPlan};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub canary: CanaryConfig,
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub max_attempts: u32,
    pub retry_delay: String,
    pub request_timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub compose_dir: String,
    pub compose_program: String,
    pub settle_delay: String,
}

/// Extra single-shot health checks on the first region before moving on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanaryConfig {
    /// Number of soak checks; 0 disables the soak.
    pub checks: u32,
    pub interval: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub endpoint: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: "2s".to_string(),
            request_timeout: "5s".to_string(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            compose_dir: ".".to_string(),
            compose_program: "docker".to_string(),
            settle_delay: "8s".to_string(),
        }
    }
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            checks: 5,
            interval: "2s".to_string(),
        }
    }
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            deploy: DeployConfig::default(),
            canary: CanaryConfig::default(),
            regions: default_regions(),
        }
    }
}

/// The four demo regions, served on consecutive local ports.
fn default_regions() -> Vec<RegionConfig> {
    [
        ("region-us-west", 8081),
        ("region-us-east", 8082),
        ("region-eu-west", 8083),
        ("region-ap-south", 8084),
    ]
    .into_iter()
    .map(|(name, port)| RegionConfig {
        name: name.to_string(),
        endpoint: format!("127.0.0.1:{port}"),
    })
    .collect()
}

impl ProbeConfig {
    pub fn retry_delay(&self) -> anyhow::Result<Duration> {
        duration_field("probe.retry_delay", &self.retry_delay)
    }

    pub fn request_timeout(&self) -> anyhow::Result<Duration> {
        duration_field("probe.request_timeout", &self.request_timeout)
    }
}

impl DeployConfig {
    pub fn settle_delay(&self) -> anyhow::Result<Duration> {
        duration_field("deploy.settle_delay", &self.settle_delay)
    }
}

impl CanaryConfig {
    pub fn interval(&self) -> anyhow::Result<Duration> {
        duration_field("canary.interval", &self.interval)
    }

    pub fn enabled(&self) -> bool {
        self.checks > 0
    }
}

impl RolloutConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: RolloutConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values that serde alone cannot reject.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.probe.max_attempts == 0 {
            bail!("probe.max_attempts must be at least 1");
        }
        self.probe.retry_delay()?;
        self.probe.request_timeout()?;
        self.deploy.settle_delay()?;
        self.canary.interval()?;

        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.name.trim().is_empty() {
                bail!("region name must not be empty");
            }
            if region.endpoint.trim().is_empty() {
                bail!("region {} has no endpoint", region.name);
            }
            if !seen.insert(region.name.as_str()) {
                bail!("region {} is listed more than once", region.name);
            }
        }
        Ok(())
    }

    /// Build a plan whose regions all start at `previous_version`.
    pub fn plan(
        &self,
        target_version: &str,
        previous_version: &str,
        failure_rate: f64,
    ) -> Result<RolloutPlan, PlanError> {
        let regions = self
            .regions
            .iter()
            .map(|r| Region::new(&r.name, &r.endpoint, previous_version))
            .collect();
        RolloutPlan::new(regions, target_version, previous_version)?.with_failure_rate(failure_rate)
    }
}

fn duration_field(name: &str, value: &str) -> anyhow::Result<Duration> {
    match parse_duration(value) {
        Some(d) => Ok(d),
        None => bail!("{name}: invalid duration {value:?} (expected e.g. \"500ms\", \"5s\", \"2m\")"),
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

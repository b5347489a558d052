use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;
use tracing::{info, warn};

use regionroll_core::{Region, RolloutConfig};
use regionroll_health::{HealthProbe, HttpRegionClient};
use regionroll_rollout::{
    CanaryOptions, ComposeOrchestrator, RolloutController, RolloutOptions, RolloutReport, format_report,
};

const DEFAULT_CONFIG: &str = "regions.toml";

/// Assumed when the first region cannot tell us what it runs.
const FALLBACK_PREVIOUS: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct RolloutArgs {
    pub target_version: String,
    pub failure_rate: f64,
    pub config: Option<PathBuf>,
    pub previous: Option<String>,
    pub output: OutputFormat,
}

/// Run one rollout and print its report. Returns the process exit code.
pub async fn run(args: RolloutArgs) -> anyhow::Result<i32> {
    let config = load_config(args.config.as_deref())?;

    let client = Arc::new(HttpRegionClient::new(config.probe.request_timeout()?));
    let probe = HealthProbe::new(client);

    let previous = match args.previous {
        Some(v) => v,
        None => detect_previous(&probe, &config).await,
    };
    if previous == args.target_version {
        warn!(version = %previous, "target version is already the running version");
    }

    let plan = config
        .plan(&args.target_version, &previous, args.failure_rate)
        .context("invalid rollout plan")?;

    let orchestrator = Arc::new(
        ComposeOrchestrator::new(&config.deploy.compose_dir)
            .with_program(&config.deploy.compose_program)
            .with_settle_delay(config.deploy.settle_delay()?),
    );
    let options = rollout_options(&config)?;

    let report = RolloutController::new(plan, orchestrator, probe, options)
        .run()
        .await;

    print_report(&report, args.output)?;
    Ok(report.exit_code())
}

/// An explicit path must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> anyhow::Result<RolloutConfig> {
    match path {
        Some(path) => RolloutConfig::from_file(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                info!(path = %default.display(), "loading region config");
                RolloutConfig::from_file(default)
            } else {
                info!("no regions.toml found, using built-in regions");
                Ok(RolloutConfig::default())
            }
        }
    }
}

/// Ask the first region what it runs.
async fn detect_previous(probe: &HealthProbe, config: &RolloutConfig) -> String {
    let Some(first) = config.regions.first() else {
        return FALLBACK_PREVIOUS.to_string();
    };
    let region = Region::new(&first.name, &first.endpoint, "unknown");

    match probe.running_version(&region).await {
        Ok(version) => {
            info!(region = %region.name, %version, "detected previous version");
            version
        }
        Err(e) => {
            warn!(
                region = %region.name,
                error = %e,
                version = FALLBACK_PREVIOUS,
                "could not detect previous version, assuming fallback"
            );
            FALLBACK_PREVIOUS.to_string()
        }
    }
}

fn rollout_options(config: &RolloutConfig) -> anyhow::Result<RolloutOptions> {
    let canary = if config.canary.enabled() {
        Some(CanaryOptions {
            checks: config.canary.checks,
            interval: config.canary.interval()?,
        })
    } else {
        None
    };

    Ok(RolloutOptions {
        max_attempts: config.probe.max_attempts,
        retry_delay: config.probe.retry_delay()?,
        canary,
    })
}

fn print_report(report: &RolloutReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => println!("{}", format_report(report)),
    }
    Ok(())
}

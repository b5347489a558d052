//! `docker compose` implementation of [`ContainerOrchestrator`].
//!
//! Each region is a compose service named after the region. A deploy
//! removes the old container, recreates it with `VERSION`, `FAILURE_RATE`
//! and `REGION` exported, and then waits a settle delay so the service can
//! start before it is probed.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use regionroll_core::Region;
use regionroll_health::{BoxFuture, Sleeper, TokioSleeper};

use crate::error::DeployError;
use crate::orchestrator::{ContainerOrchestrator, DeploySpec};

/// Drives region containers through the compose CLI.
#[derive(Clone)]
pub struct ComposeOrchestrator {
    program: String,
    project_dir: PathBuf,
    settle_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl ComposeOrchestrator {
    /// Run `docker compose` in `project_dir` with an 8 second settle delay.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "docker".to_string(),
            project_dir: project_dir.into(),
            settle_delay: Duration::from_secs(8),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    async fn deploy_region(&self, region: &Region, spec: &DeploySpec) -> Result<(), DeployError> {
        let env = service_env(region, spec);

        info!(region = %region.name, "stopping and removing old container");
        match self.run(&remove_args(&region.name), &env).await {
            Ok(output) if !output.status.success() => {
                debug!(
                    region = %region.name,
                    status = %output.status,
                    "container removal failed, recreating anyway"
                );
            }
            Ok(_) => {}
            Err(e) => debug!(region = %region.name, error = %e, "container removal failed"),
        }

        info!(region = %region.name, version = %spec.version, "starting container");
        let args = up_args(&region.name);
        let output = self.run(&args, &env).await?;
        if !output.status.success() {
            return Err(DeployError::CommandFailed {
                command: format!("{} {}", self.program, args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(
            region = %region.name,
            settle_delay = ?self.settle_delay,
            "waiting for service to start"
        );
        self.sleeper.sleep(self.settle_delay).await;
        Ok(())
    }

    async fn run(&self, args: &[String], env: &[(&'static str, String)]) -> Result<Output, DeployError> {
        Command::new(&self.program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DeployError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })
    }
}

impl ContainerOrchestrator for ComposeOrchestrator {
    fn deploy<'a>(&'a self, region: &'a Region, spec: &'a DeploySpec) -> BoxFuture<'a, Result<(), DeployError>> {
        Box::pin(self.deploy_region(region, spec))
    }
}

fn remove_args(service: &str) -> Vec<String> {
    ["compose", "rm", "-sf", service].map(String::from).to_vec()
}

fn up_args(service: &str) -> Vec<String> {
    ["compose", "up", "-d", "--no-deps", "--force-recreate", service]
        .map(String::from)
        .to_vec()
}

fn service_env(region: &Region, spec: &DeploySpec) -> Vec<(&'static str, String)> {
    vec![
        ("VERSION", spec.version.clone()),
        ("FAILURE_RATE", spec.failure_rate.to_string()),
        ("REGION", region.name.clone()),
    ]
}

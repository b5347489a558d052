//! regionroll — roll a version out across regions one at a time, rolling
//! back automatically when a region fails.
//!
//! # Usage
//!
//! ```text
//! regionroll v2            # normal rollout
//! regionroll v3 0.8        # simulate an 80% health-check failure rate
//! regionroll v2 --config regions.toml --output json
//! ```
//!
//! Exit codes: 0 every region upgraded, 1 rolled back, 3 rollback
//! incomplete, 2 bad arguments or configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

mod commands;

use commands::rollout::{OutputFormat, RolloutArgs};

#[derive(Parser)]
#[command(
    name = "regionroll",
    about = "Progressive multi-region rollout with automatic rollback",
    version
)]
struct Cli {
    /// Version to roll out, e.g. v2.
    target_version: String,

    /// Probability (0.0-1.0) that an upgraded region fails its health checks.
    #[arg(default_value_t = 0.0, value_parser = parse_failure_rate)]
    failure_rate: f64,

    /// Region configuration. Defaults to ./regions.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Version to roll back to. Detected from the first region when omitted.
    #[arg(long)]
    previous: Option<String>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Log format.
    #[arg(long, value_enum, env = "REGIONROLL_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn parse_failure_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|_| format!("{s:?} is not a number"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{rate} is outside 0.0-1.0"))
    }
}

/// Logs go to stderr so `--output json` keeps stdout clean.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let args = RolloutArgs {
        target_version: cli.target_version,
        failure_rate: cli.failure_rate,
        config: cli.config,
        previous: cli.previous,
        output: cli.output,
    };

    let code = match commands::rollout::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            2
        }
    };
    std::process::exit(code);
}

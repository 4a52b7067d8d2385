//! `token-launcher` entry point.

use anyhow::Result;
use clap::Parser;
use launcher_runtime::{execute, Cli, LauncherConfig, LauncherContext};
use launcher_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use std::process::ExitCode;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if cli.verbose {
        telemetry = telemetry.verbose();
    }
    init_telemetry(&telemetry)?;

    let config = cli.apply(LauncherConfig::from_env()?);
    config.validate()?;
    debug!(?config, "Configuration loaded");

    let context = LauncherContext::open(config)?;
    let print_metrics = cli.print_metrics;
    let result = execute(&context, cli.command).await;
    context.close().await;

    let code = match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    if print_metrics {
        println!("{}", encode_metrics()?);
    }
    Ok(code)
}

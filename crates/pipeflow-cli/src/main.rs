#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod compile;
mod config;
mod telemetry;

use std::process;

use crate::config::{Cli, Command};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "pipeflow_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "pipeflow_cli::config";
pub const TRACING_TARGET_COMPILE: &str = "pipeflow_cli::compile";

fn main() {
    let Err(error) = run() else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMPILE,
            error = %format!("{error:#}"),
            "pipeflow terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing()?;
    cli.log();

    match &cli.command {
        Command::Compile(config) => {
            config.validate()?;
            let report = compile::run(config)?;
            tracing::info!(
                target: TRACING_TARGET_COMPILE,
                workflow = %report.workflow_path.display(),
                triggers = %report.triggers_path.display(),
                diagnostics = report.diagnostics,
                "wrote compiled pipeline"
            );
        }
    }

    Ok(())
}

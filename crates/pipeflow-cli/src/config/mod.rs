//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! └── compile: CompileConfig
//!     ├── input: InputConfig    # Pipeline document and collaborator tables
//!     └── output: OutputConfig  # Output directory, strictness
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! pipeflow compile --pipeline pipeline.json --output-dir out/
//!
//! # Or via environment variables
//! PIPEFLOW_PIPELINE=pipeline.json PIPEFLOW_OUTPUT_DIR=out/ pipeflow compile
//! ```

mod input;
mod output;

use std::process;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
pub use input::InputConfig;
pub use output::OutputConfig;
use serde::{Deserialize, Serialize};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "pipeflow")]
#[command(about = "Compiles pipeline graphs into workflows and trigger rules")]
#[command(version)]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand, Serialize, Deserialize)]
pub enum Command {
    /// Compiles a pipeline document.
    Compile(CompileConfig),
}

/// Configuration of the `compile` command.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct CompileConfig {
    /// Input documents.
    #[clap(flatten)]
    pub input: InputConfig,

    /// Output location and policy.
    #[clap(flatten)]
    pub output: OutputConfig,
}

impl CompileConfig {
    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.input.validate().context("invalid input configuration")?;
        self.output
            .validate()
            .context("invalid output configuration")?;
        Ok(())
    }
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments, so its variables
    /// act as defaults for `env`-backed options.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "build information"
        );
    }

    /// Logs configuration.
    pub fn log(&self) {
        Self::log_build_info();

        match &self.command {
            Command::Compile(config) => {
                config.input.log();
                config.output.log();
                tracing::debug!(target: TRACING_TARGET_CONFIG, "compile command selected");
            }
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn parses_compile_command() {
        let cli = Cli::try_parse_from([
            "pipeflow",
            "compile",
            "--pipeline",
            "graph.json",
            "--handles",
            "handles.json",
            "--output-dir",
            "build",
            "--strict",
        ])
        .unwrap();

        let Command::Compile(config) = cli.command;
        assert_eq!(config.input.pipeline, PathBuf::from("graph.json"));
        assert_eq!(config.input.handles, Some(PathBuf::from("handles.json")));
        assert_eq!(config.input.chains, None);
        assert_eq!(config.output.output_dir, PathBuf::from("build"));
        assert!(config.output.strict);
    }

    #[test]
    fn pipeline_is_required() {
        let result = Cli::try_parse_from(["pipeflow", "compile"]);
        if std::env::var_os("PIPEFLOW_PIPELINE").is_none() {
            assert!(result.is_err());
        }
    }

    #[test]
    fn config_serializes() {
        let cli = Cli::try_parse_from(["pipeflow", "compile", "--pipeline", "graph.json"]).unwrap();
        let value = serde_json::to_value(&cli).unwrap();
        assert_eq!(
            value["command"]["Compile"]["input"]["pipeline"],
            serde_json::json!("graph.json")
        );
    }
}

//! Output configuration.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result as AnyhowResult, anyhow};
use clap::Args;
use pipeflow_compiler::engine::CompiledPipeline;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// File name of the compiled workflow document.
pub const WORKFLOW_FILE: &str = "workflow.json";

/// File name of the compiled trigger rules document.
pub const TRIGGERS_FILE: &str = "triggers.json";

/// Output configuration.
///
/// # Environment Variables
///
/// - `PIPEFLOW_OUTPUT_DIR` - Directory receiving the documents (default: out)
/// - `PIPEFLOW_STRICT` - Fail when diagnostics were recorded (default: false)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct OutputConfig {
    /// Directory receiving `workflow.json` and `triggers.json`.
    #[arg(long, env = "PIPEFLOW_OUTPUT_DIR", default_value = "out")]
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Fail instead of writing outputs when diagnostics were recorded.
    #[arg(long, env = "PIPEFLOW_STRICT", default_value_t = false)]
    #[serde(default)]
    pub strict: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

/// Paths of written documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenOutput {
    /// The workflow document.
    pub workflow_path: PathBuf,
    /// The trigger rules document.
    pub triggers_path: PathBuf,
}

impl OutputConfig {
    /// Validates the output location.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output directory must not be empty"));
        }
        if self.output_dir.is_file() {
            return Err(anyhow!(
                "output directory {} is an existing file",
                self.output_dir.display()
            ));
        }
        Ok(())
    }

    /// Writes the workflow and trigger documents.
    pub fn write(&self, compiled: &CompiledPipeline) -> AnyhowResult<WrittenOutput> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output directory {}", self.output_dir.display())
        })?;

        let workflow_path = self.output_dir.join(WORKFLOW_FILE);
        let workflow = compiled
            .workflow
            .to_json_pretty()
            .context("failed to serialize workflow")?;
        fs::write(&workflow_path, workflow)
            .with_context(|| format!("failed to write {}", workflow_path.display()))?;

        let triggers_path = self.output_dir.join(TRIGGERS_FILE);
        let triggers = serde_json::to_string_pretty(&compiled.triggers)
            .context("failed to serialize trigger rules")?;
        fs::write(&triggers_path, triggers)
            .with_context(|| format!("failed to write {}", triggers_path.display()))?;

        Ok(WrittenOutput {
            workflow_path,
            triggers_path,
        })
    }

    /// Logs output configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            output_dir = %self.output_dir.display(),
            strict = self.strict,
            "output configuration"
        );
    }
}

//! The `compile` command.

use std::path::PathBuf;

use anyhow::{Context, bail};
use pipeflow_compiler::engine::PipelineCompiler;

use crate::TRACING_TARGET_COMPILE;
use crate::config::CompileConfig;

/// Outcome of a successful compile.
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// Path of the written workflow document.
    pub workflow_path: PathBuf,
    /// Path of the written trigger rules document.
    pub triggers_path: PathBuf,
    /// Number of recovered issues.
    pub diagnostics: usize,
}

/// Loads the inputs, compiles the pipeline and writes the outputs.
///
/// In strict mode nothing is written when diagnostics were recorded.
pub fn run(config: &CompileConfig) -> anyhow::Result<CompileReport> {
    let graph = config.input.load_graph()?;
    let context = config.input.load_context()?;

    let compiled = PipelineCompiler::new(&context)
        .compile(&graph)
        .with_context(|| format!("failed to compile {}", config.input.pipeline.display()))?;

    // Each diagnostic was already logged by the compiler as it was recorded.
    let diagnostics = compiled.diagnostics.len();
    tracing::debug!(
        target: TRACING_TARGET_COMPILE,
        diagnostics,
        strict = config.output.strict,
        "compiled pipeline"
    );
    if config.output.strict && diagnostics > 0 {
        bail!("compile recorded {diagnostics} diagnostic(s) in strict mode");
    }

    let written = config.output.write(&compiled)?;
    Ok(CompileReport {
        workflow_path: written.workflow_path,
        triggers_path: written.triggers_path,
        diagnostics,
    })
}

//! Input document configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result as AnyhowResult, anyhow};
use clap::Args;
use pipeflow_compiler::definition::PipelineGraph;
use pipeflow_compiler::registry::{ChainRegistry, CompileContext, HandleRegistry, TemplateRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TRACING_TARGET_CONFIG;

/// Input document configuration.
///
/// # Environment Variables
///
/// - `PIPEFLOW_PIPELINE` - Pipeline graph document (required)
/// - `PIPEFLOW_HANDLES` - Node ID to compute handle table
/// - `PIPEFLOW_CHAINS` - Map node ID to processor chain table
/// - `PIPEFLOW_TEMPLATES` - Rule kind to trigger template table
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct InputConfig {
    /// Path to the pipeline graph document.
    #[arg(long, env = "PIPEFLOW_PIPELINE")]
    pub pipeline: PathBuf,

    /// Path to the compute handle table.
    ///
    /// Nodes without a handle compile to diagnostic pass states.
    #[arg(long, env = "PIPEFLOW_HANDLES")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handles: Option<PathBuf>,

    /// Path to the processor chain table.
    #[arg(long, env = "PIPEFLOW_CHAINS")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chains: Option<PathBuf>,

    /// Path to the trigger template table.
    #[arg(long, env = "PIPEFLOW_TEMPLATES")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<PathBuf>,
}

impl InputConfig {
    /// Validates that every configured document exists.
    pub fn validate(&self) -> AnyhowResult<()> {
        let optional = [&self.handles, &self.chains, &self.templates];
        for path in std::iter::once(&self.pipeline).chain(optional.into_iter().flatten()) {
            if !path.is_file() {
                return Err(anyhow!("{} is not a readable file", path.display()));
            }
        }
        Ok(())
    }

    /// Loads the pipeline graph.
    pub fn load_graph(&self) -> AnyhowResult<PipelineGraph> {
        let value = read_json(&self.pipeline)?;
        PipelineGraph::from_json(value)
            .with_context(|| format!("invalid pipeline document {}", self.pipeline.display()))
    }

    /// Loads the collaborator tables, leaving unconfigured ones empty.
    pub fn load_context(&self) -> AnyhowResult<CompileContext> {
        let mut context = CompileContext::new();

        if let Some(path) = &self.handles {
            let handles = HandleRegistry::new(read_json(path)?)
                .with_context(|| format!("invalid handle table {}", path.display()))?;
            context = context.with_handles(handles);
        }
        if let Some(path) = &self.chains {
            let chains = ChainRegistry::new(read_json(path)?)
                .with_context(|| format!("invalid chain table {}", path.display()))?;
            context = context.with_chains(chains);
        }
        if let Some(path) = &self.templates {
            let templates = TemplateRegistry::new(read_json(path)?)
                .with_context(|| format!("invalid template table {}", path.display()))?;
            context = context.with_templates(templates);
        }

        Ok(context)
    }

    /// Logs input configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            pipeline = %self.pipeline.display(),
            handles = ?self.handles,
            chains = ?self.chains,
            templates = ?self.templates,
            "input configuration"
        );
    }
}

fn read_json(path: &Path) -> AnyhowResult<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn config(dir: &Path) -> InputConfig {
        InputConfig {
            pipeline: dir.join("pipeline.json"),
            handles: Some(dir.join("handles.json")),
            chains: None,
            templates: None,
        }
    }

    #[test]
    fn loads_documents() {
        let dir = tempfile::tempdir().unwrap();
        let graph = json!({ "nodes": [{ "id": "a", "role": "compute" }] });
        fs::write(dir.path().join("pipeline.json"), graph.to_string()).unwrap();
        fs::write(dir.path().join("handles.json"), json!({ "a": "fn-a" }).to_string()).unwrap();

        let config = config(dir.path());
        config.validate().unwrap();
        assert_eq!(config.load_graph().unwrap().nodes.len(), 1);
        assert_eq!(config.load_context().unwrap().handles.len(), 1);
    }

    #[test]
    fn missing_documents_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pipeline.json"), "{}").unwrap();

        let error = config(dir.path()).validate().unwrap_err();
        assert!(error.to_string().contains("handles.json"));
    }

    #[test]
    fn malformed_json_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pipeline.json"), "{ not json").unwrap();

        let error = config(dir.path()).load_graph().unwrap_err();
        assert!(format!("{error:#}").contains("pipeline.json"));
    }
}

//! Pipeline compiler facade.
//!
//! The compiler takes a [`PipelineGraph`] and a [`CompileContext`] and
//! produces a [`CompiledPipeline`].
//!
//! # Compilation Process
//!
//! 1. **Analysis**: validate the graph, fold processor chains, find the
//!    first and last compute nodes on the default path
//! 2. **Synthesis**: emit the workflow states of every top-level node,
//!    recursing into Map processor chains
//! 3. **Linking**: turn links into transitions, resolve Choice branch
//!    placeholders and pick the start state
//! 4. **Triggers**: compile an event pattern for every trigger node

use serde::Serialize;

use super::config::CompilerConfig;
use super::linker::GraphLinker;
use super::synthesizer::Scope;
use crate::TRACING_TARGET;
use crate::definition::{NodeId, PipelineGraph, RuleKind};
use crate::error::{CompileResult, Diagnostic, Diagnostics};
use crate::graph::{ComputeBounds, GraphAnalyzer, StateNames};
use crate::registry::{ChainRegistry, CompileContext};
use crate::state::CompiledWorkflow;
use crate::trigger::{EventPattern, TriggerCompiler};

/// An event rule starting executions of the compiled workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTrigger {
    /// The trigger node the rule was compiled from.
    pub node_id: NodeId,
    /// The rule kind.
    pub rule: RuleKind,
    /// Event-matching pattern.
    pub pattern: EventPattern,
    /// Whether the rule is created enabled.
    pub enabled: bool,
}

/// Output of one compile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPipeline {
    /// The executable workflow.
    pub workflow: CompiledWorkflow,
    /// One rule per trigger node, in declared order.
    pub triggers: Vec<CompiledTrigger>,
    /// First compute node on the default path.
    pub first_compute: Option<NodeId>,
    /// Last compute node on the default path.
    pub last_compute: Option<NodeId>,
    /// Recovered issues, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

/// Pipeline compiler that transforms graphs into workflows and trigger rules.
#[derive(Debug, Clone)]
pub struct PipelineCompiler<'a> {
    /// Retry tiers and default paths.
    pub(super) config: CompilerConfig,
    /// Collaborator registries.
    pub(super) context: &'a CompileContext,
}

impl<'a> PipelineCompiler<'a> {
    /// Creates a compiler with the default configuration.
    pub fn new(context: &'a CompileContext) -> Self {
        Self {
            config: CompilerConfig::default(),
            context,
        }
    }

    /// Replaces the compiler configuration.
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the compiler configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a pipeline graph.
    ///
    /// # Errors
    ///
    /// Fails on structural problems of the graph. Recoverable issues are
    /// returned as [`CompiledPipeline::diagnostics`] instead.
    pub fn compile(&self, graph: &PipelineGraph) -> CompileResult<CompiledPipeline> {
        tracing::debug!(
            target: TRACING_TARGET,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "compiling pipeline"
        );

        let mut diagnostics = Diagnostics::new();
        let (mut workflow, bounds) =
            self.compile_workflow(graph, &self.context.chains, false, &mut diagnostics)?;
        workflow.comment = graph.metadata.comment();
        workflow.timeout_seconds = graph.settings.timeout_seconds;

        let triggers = self.compile_triggers(graph, &mut diagnostics);

        tracing::info!(
            target: TRACING_TARGET,
            states = workflow.states.len(),
            start_at = %workflow.start_at,
            triggers = triggers.len(),
            diagnostics = diagnostics.len(),
            "compiled pipeline"
        );

        Ok(CompiledPipeline {
            workflow,
            triggers,
            first_compute: bounds.first,
            last_compute: bounds.last,
            diagnostics: diagnostics.into_vec(),
        })
    }

    /// Compiles a graph into a workflow.
    ///
    /// Nested compiles build Map iterators: they never inject execution
    /// context into their first task.
    pub(super) fn compile_workflow(
        &self,
        graph: &PipelineGraph,
        chains: &ChainRegistry,
        nested: bool,
        diagnostics: &mut Diagnostics,
    ) -> CompileResult<(CompiledWorkflow, ComputeBounds)> {
        let analysis = GraphAnalyzer::new(chains).analyze(graph)?;
        let bounds = analysis.compute_bounds().clone();

        if !graph.has_compute() {
            tracing::debug!(
                target: TRACING_TARGET,
                nested,
                "no compute nodes, emitting no-op workflow"
            );
            return Ok((CompiledWorkflow::no_op(), bounds));
        }

        let names = StateNames::assign(analysis.state_nodes())?;
        let scope = Scope {
            analysis: &analysis,
            names: &names,
            first_compute: if nested { None } else { bounds.first.as_ref() },
            settings: &graph.settings,
        };

        let mut synthesized = Vec::new();
        for node in analysis.state_nodes() {
            synthesized.push((node, self.synthesize(node, &scope, diagnostics)?));
        }

        let workflow = GraphLinker::new(&analysis, &names).link(synthesized, diagnostics)?;
        Ok((workflow, bounds))
    }

    fn compile_triggers(
        &self,
        graph: &PipelineGraph,
        diagnostics: &mut Diagnostics,
    ) -> Vec<CompiledTrigger> {
        let compiler = TriggerCompiler::new(&self.context.templates);

        graph
            .triggers()
            .filter_map(|node| Some((node, node.rule()?)))
            .map(|(node, rule)| CompiledTrigger {
                node_id: node.id.clone(),
                rule,
                pattern: compiler.compile(rule, &node.configuration, diagnostics),
                enabled: graph.settings.auto_start,
            })
            .collect()
    }
}

//! Compile error and diagnostic types.

use serde::Serialize;
use thiserror::Error;

use crate::TRACING_TARGET;
use crate::definition::{EdgeId, NodeId, RuleKind};

/// Result type for compile operations.
pub type CompileResult<T, E = CompileError> = Result<T, E>;

/// Fatal errors that abort a compile.
///
/// Everything except [`CompileError::Serialization`] and
/// [`CompileError::InvalidConfig`] is a structural problem of the pipeline
/// graph and names the offending node or edge.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Two nodes share an ID.
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// Two edges share an ID.
    #[error("duplicate edge id: {0}")]
    DuplicateEdge(EdgeId),

    /// A node ID does not resolve to a node of the graph.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// An edge references a node that does not exist.
    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge {
        /// The offending edge.
        edge: EdgeId,
        /// The missing node.
        node: NodeId,
    },

    /// A processor chain references a node that does not exist.
    #[error("processor chain of map node {map} references unknown node {node}")]
    DanglingChainMember {
        /// The Map node owning the chain.
        map: NodeId,
        /// The missing member.
        node: NodeId,
    },

    /// More than one state has no incoming edge.
    #[error("pipeline has multiple entry points: {}", join_ids(.0))]
    MultipleEntryPoints(Vec<NodeId>),

    /// No state is free of incoming edges.
    #[error("pipeline has no entry point")]
    NoEntryPoint,

    /// The top-level graph contains a cycle.
    #[error("cycle detected in pipeline graph at node {0}")]
    Cycle(NodeId),

    /// A non-branching node has more than one outgoing edge.
    #[error("node {node} has multiple successors: {}", join_ids(.targets))]
    MultipleSuccessors {
        /// The offending node.
        node: NodeId,
        /// Targets of its outgoing edges.
        targets: Vec<NodeId>,
    },

    /// A Choice node has no outgoing edge to route its branches to.
    #[error("choice node {0} has no outgoing edges")]
    UnroutedChoice(NodeId),

    /// Node configuration is structurally invalid.
    #[error("invalid config for node {node_id}: {message}")]
    InvalidNodeConfig {
        /// ID of the node with invalid config.
        node_id: NodeId,
        /// Error message.
        message: String,
    },

    /// Two synthesized states ended up with the same name.
    #[error("state name collision: {0}")]
    StateNameCollision(String),

    /// Compiler configuration is invalid.
    #[error("invalid compiler configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Recoverable issues. The compile continues with a documented default.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    /// No compute handle was resolved; the node compiled to a diagnostic Pass.
    #[error("node {node_id} has no compute handle, compiled as a pass state")]
    MissingHandle {
        /// The unprovisioned node.
        node_id: NodeId,
    },

    /// A configuration value was unusable and replaced by its default.
    #[error("invalid parameter `{parameter}` on node {node_id}: {message}")]
    InvalidParameter {
        /// The node carrying the parameter.
        node_id: NodeId,
        /// The configuration key.
        parameter: String,
        /// What was wrong and what was used instead.
        message: String,
    },

    /// A trigger template was malformed; the base pattern was used instead.
    #[error("template for rule {rule} is malformed, using base pattern: {message}")]
    TemplateProcessing {
        /// The rule kind whose template failed.
        rule: RuleKind,
        /// Why the template was rejected.
        message: String,
    },

    /// A template placeholder had no matching trigger parameter.
    #[error("placeholder `${{{name}}}` in template for rule {rule} has no parameter, field dropped")]
    UnresolvedPlaceholder {
        /// The rule kind whose template was rendered.
        rule: RuleKind,
        /// The placeholder name.
        name: String,
    },

    /// An edge could not become a transition and was ignored.
    #[error("edge {edge} from node {node_id} ignored: {reason}")]
    IgnoredEdge {
        /// The ignored edge.
        edge: EdgeId,
        /// Its source node.
        node_id: NodeId,
        /// Why it was ignored.
        reason: String,
    },
}

/// Collects diagnostics over one compile, logging each as it is recorded.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            target: TRACING_TARGET,
            diagnostic = %diagnostic,
            "recovered compile issue"
        );
        self.entries.push(diagnostic);
    }

    /// Returns the number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over recorded diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Consumes the collector, returning the recorded diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_name_offending_ids() {
        let error = CompileError::DanglingEdge {
            edge: EdgeId::from("e7"),
            node: NodeId::from("ghost"),
        };
        assert_eq!(error.to_string(), "edge e7 references unknown node ghost");

        let error = CompileError::MultipleEntryPoints(vec![NodeId::from("a"), NodeId::from("b")]);
        assert_eq!(error.to_string(), "pipeline has multiple entry points: a, b");
    }

    #[test]
    fn placeholder_diagnostic_renders_braces() {
        let diagnostic = Diagnostic::UnresolvedPlaceholder {
            rule: RuleKind::IngestCompleted,
            name: "Format".into(),
        };
        assert_eq!(
            diagnostic.to_string(),
            "placeholder `${Format}` in template for rule ingest-completed has no parameter, field dropped"
        );
    }

    #[test]
    fn diagnostics_collects_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::MissingHandle {
            node_id: NodeId::from("a"),
        });
        diagnostics.push(Diagnostic::MissingHandle {
            node_id: NodeId::from("b"),
        });

        let ids: Vec<_> = diagnostics
            .into_vec()
            .into_iter()
            .map(|d| match d {
                Diagnostic::MissingHandle { node_id } => node_id,
                other => panic!("unexpected diagnostic: {other}"),
            })
            .collect();
        assert_eq!(ids, vec![NodeId::from("a"), NodeId::from("b")]);
    }
}

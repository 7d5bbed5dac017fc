//! Pipeline definition types.
//!
//! This module contains the serializable, editor-friendly types a pipeline
//! author produces:
//! - [`PipelineGraph`]: nodes, edges, settings and metadata
//! - [`Node`] and [`NodeRole`]: typed pipeline steps
//! - [`Edge`]: directed connections between nodes
//!
//! Definitions are read-only input to the [`crate::engine::PipelineCompiler`].

use serde::{Deserialize, Serialize};

mod edge;
mod kind;
mod metadata;
mod node;
mod settings;

pub use edge::{Edge, EdgeBuilder, EdgeId};
pub use kind::{FlowControl, RuleKind};
pub use metadata::PipelineMetadata;
pub use node::{Configuration, Node, NodeBuilder, NodeId, NodeRole};
pub use settings::PipelineSettings;

use crate::error::{CompileError, CompileResult};

/// Serializable pipeline definition.
///
/// Node and edge order is significant: it is the declared order used when
/// walking the default path and when designating Choice outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineGraph {
    /// Nodes in declared order.
    pub nodes: Vec<Node>,
    /// Edges in declared order.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Execution settings.
    #[serde(default)]
    pub settings: PipelineSettings,
    /// Pipeline metadata.
    #[serde(default)]
    pub metadata: PipelineMetadata,
}

impl PipelineGraph {
    /// Parses a pipeline graph from a JSON value.
    pub fn from_json(value: serde_json::Value) -> CompileResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns a node by ID.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Returns an iterator over trigger nodes in declared order.
    pub fn triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_trigger())
    }

    /// Returns whether any node, processor chain members included, is
    /// backed by a compute handle.
    pub fn has_compute(&self) -> bool {
        self.nodes.iter().any(Node::is_handle_backed)
    }

    /// Builds the linear sub-graph formed by a Map node's processor chain.
    ///
    /// Every member is recast as a compute node and chained in order, so the
    /// result compiles to a sequence of tasks with one entry and one terminal
    /// state.
    pub fn processor_subgraph(&self, map: &NodeId, chain: &[NodeId]) -> CompileResult<Self> {
        let nodes = chain
            .iter()
            .map(|member| {
                let node = self
                    .node(member)
                    .ok_or_else(|| CompileError::DanglingChainMember {
                        map: map.clone(),
                        node: member.clone(),
                    })?;
                Ok(Node {
                    role: NodeRole::Compute,
                    ..node.clone()
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let edges = chain
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                Edge::new(format!("{map}:chain:{i}"), pair[0].clone(), pair[1].clone())
            })
            .collect();

        Ok(Self {
            nodes,
            edges,
            settings: self.settings.clone(),
            metadata: PipelineMetadata::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> PipelineGraph {
        PipelineGraph::from_json(json!({
            "nodes": [
                { "id": "t", "role": "trigger", "rule": "ingest-completed" },
                { "id": "m", "role": "flow-control", "control": "map", "label": "Each" },
                { "id": "p1", "role": "flow-control", "control": "wait" },
                { "id": "p2", "role": "compute", "label": "Thumb" }
            ],
            "edges": [
                { "id": "e1", "source": "t", "target": "m" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn parses_with_default_settings() {
        let graph = sample();
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.settings, PipelineSettings::default());
        assert_eq!(graph.triggers().count(), 1);
        assert!(graph.has_compute());
    }

    #[test]
    fn integration_nodes_count_as_compute() {
        let graph = PipelineGraph::from_json(json!({
            "nodes": [
                { "id": "t", "role": "trigger", "rule": "asset-updated" },
                { "id": "n", "role": "integration", "label": "Notify" }
            ]
        }))
        .unwrap();
        assert!(graph.has_compute());

        let graph = PipelineGraph::from_json(json!({
            "nodes": [{ "id": "w", "role": "flow-control", "control": "wait" }]
        }))
        .unwrap();
        assert!(!graph.has_compute());
    }

    #[test]
    fn processor_subgraph_chains_members_as_compute() {
        let graph = sample();
        let chain = vec![NodeId::from("p1"), NodeId::from("p2")];
        let sub = graph.processor_subgraph(&NodeId::from("m"), &chain).unwrap();

        assert_eq!(sub.nodes.len(), 2);
        assert!(sub.nodes.iter().all(Node::is_compute));
        assert_eq!(sub.edges.len(), 1);
        assert_eq!(sub.edges[0].source.as_str(), "p1");
        assert_eq!(sub.edges[0].target.as_str(), "p2");
    }

    #[test]
    fn processor_subgraph_rejects_unknown_member() {
        let graph = sample();
        let chain = vec![NodeId::from("ghost")];
        let result = graph.processor_subgraph(&NodeId::from("m"), &chain);
        assert!(matches!(
            result,
            Err(CompileError::DanglingChainMember { .. })
        ));
    }
}

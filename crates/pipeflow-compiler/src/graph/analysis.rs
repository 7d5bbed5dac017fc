//! Structural analysis of pipeline graphs.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::TRACING_TARGET;
use crate::definition::{EdgeId, FlowControl, Node, NodeId, PipelineGraph};
use crate::error::{CompileError, CompileResult};
use crate::registry::ChainRegistry;

/// A directed connection in the folded top-level view.
///
/// Endpoints are the original edge endpoints, except that processor chain
/// members are replaced by the Map node owning the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The edge this link was derived from.
    pub edge: EdgeId,
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Output port on the source node.
    pub port: Option<String>,
}

/// First and last handle-backed nodes on the default path.
///
/// Integration nodes compile to the same Task as compute nodes and count as
/// compute steps here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputeBounds {
    /// The first compute node reached.
    pub first: Option<NodeId>,
    /// The last compute node reached.
    pub last: Option<NodeId>,
}

/// Validates pipeline graphs and builds their top-level [`Analysis`].
#[derive(Debug, Clone, Copy)]
pub struct GraphAnalyzer<'a> {
    chains: &'a ChainRegistry,
}

impl<'a> GraphAnalyzer<'a> {
    /// Creates an analyzer folding the given processor chains.
    pub fn new(chains: &'a ChainRegistry) -> Self {
        Self { chains }
    }

    /// Analyzes a graph.
    ///
    /// # Errors
    ///
    /// Fails on duplicate node or edge IDs, edges or chain members that
    /// reference unknown nodes, and cycles in the folded top-level view.
    pub fn analyze<'g>(&self, graph: &'g PipelineGraph) -> CompileResult<Analysis<'g>> {
        let nodes = index_nodes(graph)?;
        validate_edges(graph, &nodes)?;
        let (enclosed, chains) = self.collect_chains(graph, &nodes)?;

        let mut outgoing: HashMap<NodeId, Vec<Link>> = HashMap::new();
        let mut incoming: HashMap<NodeId, Vec<Link>> = HashMap::new();
        for link in fold_links(graph, &enclosed) {
            incoming
                .entry(link.target.clone())
                .or_default()
                .push(link.clone());
            outgoing.entry(link.source.clone()).or_default().push(link);
        }

        let mut analysis = Analysis {
            graph,
            nodes,
            outgoing,
            incoming,
            enclosed,
            chains,
            bounds: ComputeBounds::default(),
        };
        analysis.check_acyclic()?;
        analysis.bounds = analysis.walk_default_path();

        tracing::debug!(
            target: TRACING_TARGET,
            nodes = analysis.nodes.len(),
            folded = analysis.enclosed.len(),
            first_compute = ?analysis.bounds.first,
            last_compute = ?analysis.bounds.last,
            "analyzed pipeline graph"
        );

        Ok(analysis)
    }

    /// Records the chains of Map nodes present in the graph.
    ///
    /// Returns the member to owning Map table and the per-Map chains.
    fn collect_chains(
        &self,
        graph: &PipelineGraph,
        nodes: &HashMap<&NodeId, &Node>,
    ) -> CompileResult<(HashMap<NodeId, NodeId>, HashMap<NodeId, Vec<NodeId>>)> {
        let mut enclosed = HashMap::new();
        let mut chains = HashMap::new();

        for node in &graph.nodes {
            if node.flow_control() != Some(FlowControl::Map) {
                continue;
            }
            let Some(chain) = self.chains.chain_of(&node.id) else {
                continue;
            };

            for member in chain {
                if !nodes.contains_key(member) {
                    return Err(CompileError::DanglingChainMember {
                        map: node.id.clone(),
                        node: member.clone(),
                    });
                }
                if member == &node.id {
                    return Err(CompileError::InvalidNodeConfig {
                        node_id: node.id.clone(),
                        message: "map node cannot be a member of its own processor chain".into(),
                    });
                }
                if let Some(owner) = enclosed.insert(member.clone(), node.id.clone()) {
                    return Err(CompileError::InvalidNodeConfig {
                        node_id: member.clone(),
                        message: format!(
                            "node belongs to the processor chains of both {owner} and {}",
                            node.id
                        ),
                    });
                }
            }
            chains.insert(node.id.clone(), chain.to_vec());
        }

        Ok((enclosed, chains))
    }
}

fn index_nodes(graph: &PipelineGraph) -> CompileResult<HashMap<&NodeId, &Node>> {
    let mut nodes = HashMap::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if nodes.insert(&node.id, node).is_some() {
            return Err(CompileError::DuplicateNode(node.id.clone()));
        }
    }
    Ok(nodes)
}

fn validate_edges(graph: &PipelineGraph, nodes: &HashMap<&NodeId, &Node>) -> CompileResult<()> {
    let mut seen = HashSet::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        if !seen.insert(&edge.id) {
            return Err(CompileError::DuplicateEdge(edge.id.clone()));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !nodes.contains_key(endpoint) {
                return Err(CompileError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Rewrites edges onto the top-level view.
///
/// Edges inside a chain, and from a Map into its own chain, disappear.
/// When a rewritten edge and another edge land on the same pair, only the
/// first one in declared order is kept.
fn fold_links(graph: &PipelineGraph, enclosed: &HashMap<NodeId, NodeId>) -> Vec<Link> {
    let owner = |id: &NodeId| enclosed.get(id).unwrap_or(id).clone();
    // Pair to whether any edge on it was rewritten.
    let mut seen: HashMap<(NodeId, NodeId), bool> = HashMap::new();
    let mut links = Vec::with_capacity(graph.edges.len());

    for edge in &graph.edges {
        let source = owner(&edge.source);
        let target = owner(&edge.target);
        let folded = source != edge.source || target != edge.target;

        if folded && source == target {
            continue;
        }
        match seen.get_mut(&(source.clone(), target.clone())) {
            Some(any_folded) if folded || *any_folded => {
                *any_folded = true;
                continue;
            }
            Some(_) => {}
            None => {
                seen.insert((source.clone(), target.clone()), folded);
            }
        }

        links.push(Link {
            edge: edge.id.clone(),
            source,
            target,
            port: edge.source_handle.clone(),
        });
    }

    links
}

/// The validated, folded top-level view of a pipeline graph.
#[derive(Debug)]
pub struct Analysis<'g> {
    graph: &'g PipelineGraph,
    nodes: HashMap<&'g NodeId, &'g Node>,
    outgoing: HashMap<NodeId, Vec<Link>>,
    incoming: HashMap<NodeId, Vec<Link>>,
    enclosed: HashMap<NodeId, NodeId>,
    chains: HashMap<NodeId, Vec<NodeId>>,
    bounds: ComputeBounds,
}

impl<'g> Analysis<'g> {
    /// Returns the analyzed graph.
    pub fn graph(&self) -> &'g PipelineGraph {
        self.graph
    }

    /// Returns a node by ID.
    pub fn node(&self, id: &NodeId) -> Option<&'g Node> {
        self.nodes.get(id).copied()
    }

    /// Returns nodes of the top-level view in declared order.
    pub fn top_level_nodes(&self) -> impl Iterator<Item = &'g Node> + '_ {
        self.graph
            .nodes
            .iter()
            .filter(|node| !self.enclosed.contains_key(&node.id))
    }

    /// Returns the top-level nodes that become workflow states.
    ///
    /// Trigger nodes are never materialized as states.
    pub fn state_nodes(&self) -> impl Iterator<Item = &'g Node> + '_ {
        self.top_level_nodes().filter(|node| !node.is_trigger())
    }

    /// Returns outgoing links of a node in declared edge order.
    pub fn outgoing(&self, id: &NodeId) -> &[Link] {
        self.outgoing.get(id).map_or(&[], Vec::as_slice)
    }

    /// Returns incoming links of a node in declared edge order.
    pub fn incoming(&self, id: &NodeId) -> &[Link] {
        self.incoming.get(id).map_or(&[], Vec::as_slice)
    }

    /// Returns the processor chain of a Map node.
    pub fn chain_of(&self, map: &NodeId) -> Option<&[NodeId]> {
        self.chains.get(map).map(Vec::as_slice)
    }

    /// Returns the Map node owning a chain member.
    pub fn enclosing_map(&self, id: &NodeId) -> Option<&NodeId> {
        self.enclosed.get(id)
    }

    /// Returns the first and last compute nodes on the default path.
    pub fn compute_bounds(&self) -> &ComputeBounds {
        &self.bounds
    }

    fn check_acyclic(&self) -> CompileResult<()> {
        let mut dag = DiGraph::<&NodeId, ()>::new();
        let indices: HashMap<&NodeId, NodeIndex> = self
            .top_level_nodes()
            .map(|node| (&node.id, dag.add_node(&node.id)))
            .collect();

        for node in self.top_level_nodes() {
            for link in self.outgoing(&node.id) {
                if let (Some(&from), Some(&to)) =
                    (indices.get(&link.source), indices.get(&link.target))
                {
                    dag.add_edge(from, to, ());
                }
            }
        }

        toposort(&dag, None)
            .map(|_| ())
            .map_err(|cycle| CompileError::Cycle(dag[cycle.node_id()].clone()))
    }

    /// Walks the default path, following the first outgoing link of every
    /// node, from trigger nodes or, absent any, from nodes without incoming
    /// links.
    fn walk_default_path(&self) -> ComputeBounds {
        let top: Vec<&Node> = self.top_level_nodes().collect();
        let mut starts: Vec<&NodeId> = top
            .iter()
            .filter(|node| node.is_trigger())
            .map(|node| &node.id)
            .collect();
        if starts.is_empty() {
            starts = top
                .iter()
                .filter(|node| self.incoming(&node.id).is_empty())
                .map(|node| &node.id)
                .collect();
        }

        let mut bounds = ComputeBounds::default();
        let mut visited = HashSet::new();

        for start in starts {
            let mut cursor = Some(start);
            while let Some(id) = cursor {
                if !visited.insert(id) {
                    break;
                }
                if self.node(id).is_some_and(Node::is_handle_backed) {
                    if bounds.first.is_none() {
                        bounds.first = Some(id.clone());
                    }
                    bounds.last = Some(id.clone());
                }
                cursor = self.outgoing(id).first().map(|link| &link.target);
            }
        }

        bounds
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn graph(value: serde_json::Value) -> PipelineGraph {
        PipelineGraph::from_json(value).unwrap()
    }

    fn ids(links: &[Link]) -> Vec<&str> {
        links.iter().map(|link| link.target.as_str()).collect()
    }

    #[test]
    fn finds_compute_bounds_from_trigger() {
        let graph = graph(json!({
            "nodes": [
                { "id": "t", "role": "trigger", "rule": "ingest-completed" },
                { "id": "a", "role": "compute" },
                { "id": "w", "role": "flow-control", "control": "wait" },
                { "id": "b", "role": "compute" }
            ],
            "edges": [
                { "id": "e1", "source": "t", "target": "a" },
                { "id": "e2", "source": "a", "target": "w" },
                { "id": "e3", "source": "w", "target": "b" }
            ]
        }));
        let chains = ChainRegistry::default();
        let analysis = GraphAnalyzer::new(&chains).analyze(&graph).unwrap();

        let bounds = analysis.compute_bounds();
        assert_eq!(bounds.first, Some(NodeId::from("a")));
        assert_eq!(bounds.last, Some(NodeId::from("b")));
        assert_eq!(analysis.state_nodes().count(), 3);
    }

    #[test]
    fn walks_from_roots_without_triggers() {
        let graph = graph(json!({
            "nodes": [
                { "id": "b", "role": "compute" },
                { "id": "a", "role": "compute" }
            ],
            "edges": [{ "id": "e1", "source": "a", "target": "b" }]
        }));
        let chains = ChainRegistry::default();
        let analysis = GraphAnalyzer::new(&chains).analyze(&graph).unwrap();

        let bounds = analysis.compute_bounds();
        assert_eq!(bounds.first, Some(NodeId::from("a")));
        assert_eq!(bounds.last, Some(NodeId::from("b")));
    }

    #[test]
    fn single_compute_is_first_and_last() {
        let graph = graph(json!({ "nodes": [{ "id": "only", "role": "compute" }] }));
        let chains = ChainRegistry::default();
        let analysis = GraphAnalyzer::new(&chains).analyze(&graph).unwrap();

        let bounds = analysis.compute_bounds();
        assert_eq!(bounds.first, bounds.last);
        assert_eq!(bounds.first, Some(NodeId::from("only")));
    }

    #[test]
    fn no_compute_yields_empty_bounds() {
        let graph = graph(json!({
            "nodes": [{ "id": "w", "role": "flow-control", "control": "wait" }]
        }));
        let chains = ChainRegistry::default();
        let analysis = GraphAnalyzer::new(&chains).analyze(&graph).unwrap();

        assert_eq!(analysis.compute_bounds(), &ComputeBounds::default());
    }

    #[test]
    fn rejects_structural_errors() {
        let chains = ChainRegistry::default();
        let analyzer = GraphAnalyzer::new(&chains);

        let duplicate = graph(json!({
            "nodes": [{ "id": "a", "role": "compute" }, { "id": "a", "role": "compute" }]
        }));
        assert!(matches!(
            analyzer.analyze(&duplicate),
            Err(CompileError::DuplicateNode(id)) if id.as_str() == "a"
        ));

        let dangling = graph(json!({
            "nodes": [{ "id": "a", "role": "compute" }],
            "edges": [{ "id": "e1", "source": "a", "target": "ghost" }]
        }));
        assert!(matches!(
            analyzer.analyze(&dangling),
            Err(CompileError::DanglingEdge { node, .. }) if node.as_str() == "ghost"
        ));

        let duplicate_edge = graph(json!({
            "nodes": [{ "id": "a", "role": "compute" }, { "id": "b", "role": "compute" }],
            "edges": [
                { "id": "e1", "source": "a", "target": "b" },
                { "id": "e1", "source": "a", "target": "b" }
            ]
        }));
        assert!(matches!(
            analyzer.analyze(&duplicate_edge),
            Err(CompileError::DuplicateEdge(_))
        ));
    }

    #[test]
    fn rejects_cycles() {
        let graph = graph(json!({
            "nodes": [{ "id": "a", "role": "compute" }, { "id": "b", "role": "compute" }],
            "edges": [
                { "id": "e1", "source": "a", "target": "b" },
                { "id": "e2", "source": "b", "target": "a" }
            ]
        }));
        let chains = ChainRegistry::default();
        let result = GraphAnalyzer::new(&chains).analyze(&graph);
        assert!(matches!(result, Err(CompileError::Cycle(_))));
    }

    #[test]
    fn folds_processor_chains_into_map() {
        let graph = graph(json!({
            "nodes": [
                { "id": "a", "role": "compute" },
                { "id": "m", "role": "flow-control", "control": "map" },
                { "id": "p1", "role": "compute" },
                { "id": "p2", "role": "compute" },
                { "id": "z", "role": "compute" }
            ],
            "edges": [
                { "id": "e1", "source": "a", "target": "m" },
                { "id": "e2", "source": "m", "target": "p1" },
                { "id": "e3", "source": "p1", "target": "p2" },
                { "id": "e4", "source": "p2", "target": "z" }
            ]
        }));
        let mut chains = ChainRegistry::default();
        chains.insert("m", ["p1", "p2"]);
        let analysis = GraphAnalyzer::new(&chains).analyze(&graph).unwrap();

        let states: Vec<_> = analysis.state_nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(states, vec!["a", "m", "z"]);
        assert_eq!(ids(analysis.outgoing(&NodeId::from("m"))), vec!["z"]);
        assert_eq!(
            analysis.enclosing_map(&NodeId::from("p2")),
            Some(&NodeId::from("m"))
        );
        assert_eq!(analysis.compute_bounds().last, Some(NodeId::from("z")));
    }

    #[test]
    fn folded_duplicates_collapse_in_either_order() {
        let edges = [
            json!({ "id": "e1", "source": "a", "target": "m" }),
            json!({ "id": "e2", "source": "m", "target": "p1" }),
            json!({ "id": "e3", "source": "p1", "target": "z" }),
            json!({ "id": "e4", "source": "m", "target": "z" }),
        ];
        let mut chains = ChainRegistry::default();
        chains.insert("m", ["p1"]);

        for order in [[0, 1, 2, 3], [0, 1, 3, 2]] {
            let graph = graph(json!({
                "nodes": [
                    { "id": "a", "role": "compute" },
                    { "id": "m", "role": "flow-control", "control": "map" },
                    { "id": "p1", "role": "compute" },
                    { "id": "z", "role": "compute" }
                ],
                "edges": order.map(|i| edges[i].clone())
            }));
            let analysis = GraphAnalyzer::new(&chains).analyze(&graph).unwrap();
            assert_eq!(ids(analysis.outgoing(&NodeId::from("m"))), vec!["z"]);
            assert_eq!(analysis.incoming(&NodeId::from("z")).len(), 1);
        }
    }

    #[test]
    fn rejects_unknown_chain_member() {
        let graph = graph(json!({
            "nodes": [{ "id": "m", "role": "flow-control", "control": "map" }]
        }));
        let mut chains = ChainRegistry::default();
        chains.insert("m", ["ghost"]);
        let result = GraphAnalyzer::new(&chains).analyze(&graph);
        assert!(matches!(
            result,
            Err(CompileError::DanglingChainMember { .. })
        ));
    }

    #[test]
    fn preserves_declared_edge_order() {
        let graph = graph(json!({
            "nodes": [
                { "id": "c", "role": "flow-control", "control": "choice" },
                { "id": "x", "role": "compute" },
                { "id": "y", "role": "compute" },
                { "id": "z", "role": "compute" }
            ],
            "edges": [
                { "id": "e1", "source": "c", "target": "y" },
                { "id": "e2", "source": "c", "target": "z" },
                { "id": "e3", "source": "c", "target": "x" }
            ]
        }));
        let chains = ChainRegistry::default();
        let analysis = GraphAnalyzer::new(&chains).analyze(&graph).unwrap();
        assert_eq!(ids(analysis.outgoing(&NodeId::from("c"))), vec!["y", "z", "x"]);
    }
}

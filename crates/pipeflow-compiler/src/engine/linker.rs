//! Transition linking and Choice branch resolution.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::synthesizer::NodeStates;
use crate::TRACING_TARGET;
use crate::definition::{FlowControl, Node, NodeId};
use crate::error::{CompileError, CompileResult, Diagnostic, Diagnostics};
use crate::graph::{Analysis, Link, StateNames};
use crate::state::{BranchSlot, ChoiceState, ChoiceTarget, CompiledWorkflow, Transition};

/// Output port designating a Choice branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Port {
    /// The branch of one configured condition.
    Condition(usize),
    /// Every condition branch.
    True,
    /// The default branch.
    Default,
    /// No recognized port.
    Unported,
}

impl Port {
    fn parse(port: Option<&str>) -> Self {
        match port.map(str::trim) {
            None => Self::Unported,
            Some("true") => Self::True,
            Some("false" | "default") => Self::Default,
            Some(port) => port
                .strip_prefix("condition-")
                .and_then(|index| index.parse().ok())
                .map_or(Self::Unported, Self::Condition),
        }
    }
}

/// Turns links between synthesized nodes into a workflow.
pub(super) struct GraphLinker<'a> {
    analysis: &'a Analysis<'a>,
    names: &'a StateNames,
}

impl<'a> GraphLinker<'a> {
    pub fn new(analysis: &'a Analysis<'a>, names: &'a StateNames) -> Self {
        Self { analysis, names }
    }

    /// Links synthesized node states and picks the start state.
    pub fn link(
        &self,
        synthesized: Vec<(&Node, NodeStates)>,
        diagnostics: &mut Diagnostics,
    ) -> CompileResult<CompiledWorkflow> {
        let mut states = BTreeMap::new();

        for (node, mut node_states) in synthesized {
            let links = self.state_links(node, diagnostics);

            match node.flow_control() {
                Some(control) if control.is_terminal() => {
                    for link in links {
                        diagnostics.push(Diagnostic::IgnoredEdge {
                            edge: link.edge.clone(),
                            node_id: node.id.clone(),
                            reason: format!("{control} states have no successor"),
                        });
                    }
                }
                Some(FlowControl::Choice) => {
                    let choice = node_states
                        .states
                        .iter_mut()
                        .find(|(name, _)| *name == node_states.primary)
                        .and_then(|(_, state)| state.as_choice_mut());
                    if let Some(choice) = choice {
                        self.route_choice(node, choice, &links, diagnostics)?;
                    }
                }
                _ => self.connect_exits(node, &mut node_states, &links)?,
            }

            for (name, state) in node_states.states {
                if states.insert(name.clone(), state).is_some() {
                    return Err(CompileError::StateNameCollision(name));
                }
            }
        }

        let start_at = self.entry_point()?;
        tracing::debug!(
            target: TRACING_TARGET,
            states = states.len(),
            start_at = %start_at,
            "linked workflow"
        );

        Ok(CompiledWorkflow {
            comment: None,
            start_at,
            states,
            timeout_seconds: None,
        })
    }

    /// Returns outgoing links of a node that lead to other states.
    fn state_links(&self, node: &Node, diagnostics: &mut Diagnostics) -> Vec<&'a Link> {
        let mut links = Vec::new();
        for link in self.analysis.outgoing(&node.id) {
            if self.is_state_node(&link.target) {
                links.push(link);
            } else {
                diagnostics.push(Diagnostic::IgnoredEdge {
                    edge: link.edge.clone(),
                    node_id: node.id.clone(),
                    reason: format!("target {} is a trigger node", link.target),
                });
            }
        }
        links
    }

    fn is_state_node(&self, id: &NodeId) -> bool {
        self.analysis.node(id).is_some_and(|node| !node.is_trigger())
    }

    /// Points every exit state of a node at its single successor.
    fn connect_exits(
        &self,
        node: &Node,
        node_states: &mut NodeStates,
        links: &[&Link],
    ) -> CompileResult<()> {
        let next = match links {
            [] => return Ok(()),
            [link] => self.names.name_of(&link.target)?,
            _ => {
                return Err(CompileError::MultipleSuccessors {
                    node: node.id.clone(),
                    targets: links.iter().map(|link| link.target.clone()).collect(),
                });
            }
        };

        for (name, state) in &mut node_states.states {
            if !node_states.exits.contains(name) {
                continue;
            }
            if let Some(transition) = state.transition_mut() {
                *transition = Transition::Next(next.to_owned());
            }
        }
        Ok(())
    }

    /// Resolves the branch placeholders of a Choice state.
    ///
    /// Ported links go to the branch they name. Unported links, in declared
    /// order, fill the condition branches first and the default second. A
    /// single link serves every branch.
    fn route_choice(
        &self,
        node: &Node,
        choice: &mut ChoiceState,
        links: &[&Link],
        diagnostics: &mut Diagnostics,
    ) -> CompileResult<()> {
        let Some(first) = links.first() else {
            return Err(CompileError::UnroutedChoice(node.id.clone()));
        };
        let fallback = self.names.name_of(&first.target)?;

        let configured: HashSet<usize> = choice
            .choices
            .iter()
            .filter_map(|rule| match &rule.next {
                ChoiceTarget::Pending(handle) => match handle.slot {
                    BranchSlot::Condition(index) => Some(index),
                    BranchSlot::Default => None,
                },
                ChoiceTarget::State(_) => None,
            })
            .collect();

        let mut conditions: HashMap<usize, Option<&str>> = HashMap::new();
        let mut on_true: Option<&str> = None;
        let mut on_default: Option<&str> = None;
        let mut unported = Vec::new();

        if links.len() > 1 {
            for link in links {
                let target = self.names.name_of(&link.target)?;
                let routed = match Port::parse(link.port.as_deref()) {
                    Port::Condition(index) => {
                        configured.contains(&index)
                            && claim(conditions.entry(index).or_default(), target)
                    }
                    Port::True => claim(&mut on_true, target),
                    Port::Default => claim(&mut on_default, target),
                    Port::Unported => {
                        unported.push((*link, target));
                        true
                    }
                };
                if !routed {
                    self.ignore_choice_link(node, link, diagnostics);
                }
            }
        }

        let mut unported = unported.into_iter();
        if on_true.is_none()
            && conditions.len() < configured.len()
            && let Some((_, target)) = unported.next()
        {
            on_true = Some(target);
        }
        if on_default.is_none()
            && let Some((_, target)) = unported.next()
        {
            on_default = Some(target);
        }
        for (link, _) in unported {
            self.ignore_choice_link(node, link, diagnostics);
        }

        for rule in &mut choice.choices {
            let ChoiceTarget::Pending(handle) = &rule.next else {
                continue;
            };
            let target = match handle.slot {
                BranchSlot::Condition(index) => {
                    conditions.get(&index).copied().flatten().or(on_true)
                }
                BranchSlot::Default => on_default,
            };
            rule.next = ChoiceTarget::State(target.or(on_default).unwrap_or(fallback).to_owned());
        }
        if !choice.default.is_resolved() {
            let target = on_default.or(on_true).unwrap_or(fallback);
            choice.default = ChoiceTarget::State(target.to_owned());
        }

        Ok(())
    }

    fn ignore_choice_link(&self, node: &Node, link: &Link, diagnostics: &mut Diagnostics) {
        diagnostics.push(Diagnostic::IgnoredEdge {
            edge: link.edge.clone(),
            node_id: node.id.clone(),
            reason: match &link.port {
                Some(port) => format!("choice output `{port}` is already routed or unknown"),
                None => "every choice output is already routed".into(),
            },
        });
    }

    /// Returns the name of the unique state without incoming links.
    fn entry_point(&self) -> CompileResult<String> {
        let entries: Vec<&Node> = self
            .analysis
            .state_nodes()
            .filter(|node| {
                !self
                    .analysis
                    .incoming(&node.id)
                    .iter()
                    .any(|link| self.is_state_node(&link.source))
            })
            .collect();

        match entries.as_slice() {
            [entry] => Ok(self.names.name_of(&entry.id)?.to_owned()),
            [] => Err(CompileError::NoEntryPoint),
            _ => Err(CompileError::MultipleEntryPoints(
                entries.iter().map(|node| node.id.clone()).collect(),
            )),
        }
    }
}

/// Stores a target in an empty slot, returning whether it was stored.
fn claim<'n>(slot: &mut Option<&'n str>, target: &'n str) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(target);
    true
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::definition::PipelineGraph;
    use crate::engine::{CompiledPipeline, PipelineCompiler};
    use crate::registry::{CompileContext, HandleRegistry};
    use crate::state::WorkflowState;

    fn compile(graph: Value) -> CompileResult<CompiledPipeline> {
        let graph = PipelineGraph::from_json(graph)?;
        let handles: HandleRegistry = graph
            .nodes
            .iter()
            .map(|node| (node.id.clone(), format!("fn-{}", node.id)))
            .collect();
        let context = CompileContext::new().with_handles(handles);
        PipelineCompiler::new(&context).compile(&graph)
    }

    /// Builds `a -> c` plus the branch targets `edges` reach, so no target
    /// is left as a second entry point.
    fn choice_graph(conditions: Value, edges: Value) -> Value {
        let mut nodes = vec![
            json!({ "id": "a", "role": "compute", "label": "A" }),
            json!({
                "id": "c", "role": "flow-control", "control": "choice", "label": "C",
                "configuration": { "conditions": conditions }
            }),
        ];
        for id in ["x", "y", "z"] {
            let reached = edges
                .as_array()
                .is_some_and(|edges| edges.iter().any(|edge| edge["target"] == id));
            if reached {
                nodes.push(json!({ "id": id, "role": "compute", "label": id.to_uppercase() }));
            }
        }
        json!({ "nodes": nodes, "edges": edges })
    }

    fn targets(compiled: &CompiledPipeline) -> (Vec<String>, String) {
        let choice = compiled.workflow.state("C").unwrap().as_choice().unwrap();
        let branches = choice.choices.iter().map(|rule| rule.next.to_string()).collect();
        (branches, choice.default.to_string())
    }

    #[test]
    fn port_parsing() {
        assert_eq!(Port::parse(None), Port::Unported);
        assert_eq!(Port::parse(Some("true")), Port::True);
        assert_eq!(Port::parse(Some(" false ")), Port::Default);
        assert_eq!(Port::parse(Some("default")), Port::Default);
        assert_eq!(Port::parse(Some("condition-2")), Port::Condition(2));
        assert_eq!(Port::parse(Some("condition-x")), Port::Unported);
    }

    #[test]
    fn unported_edges_fill_conditions_then_default() {
        let compiled = compile(choice_graph(
            json!([{ "variable": "$.s", "value": "ok" }]),
            json!([
                { "id": "e0", "source": "a", "target": "c" },
                { "id": "e1", "source": "c", "target": "y" },
                { "id": "e2", "source": "c", "target": "x" }
            ]),
        ))
        .unwrap();

        assert_eq!(targets(&compiled), (vec!["Y".to_owned()], "X".to_owned()));
        assert!(compiled.diagnostics.is_empty());
    }

    #[test]
    fn condition_ports_route_individual_branches() {
        let compiled = compile(choice_graph(
            json!([
                { "variable": "$.s", "value": "a" },
                { "variable": "$.s", "value": "b" }
            ]),
            json!([
                { "id": "e0", "source": "a", "target": "c" },
                { "id": "e1", "source": "c", "target": "x", "sourceHandle": "condition-1" },
                { "id": "e2", "source": "c", "target": "y", "sourceHandle": "condition-0" },
                { "id": "e3", "source": "c", "target": "z", "sourceHandle": "default" }
            ]),
        ))
        .unwrap();

        assert_eq!(
            targets(&compiled),
            (vec!["Y".to_owned(), "X".to_owned()], "Z".to_owned())
        );
    }

    #[test]
    fn single_edge_serves_every_branch() {
        let compiled = compile(choice_graph(
            json!([]),
            json!([
                { "id": "e0", "source": "a", "target": "c" },
                { "id": "e1", "source": "c", "target": "x", "sourceHandle": "false" }
            ]),
        ))
        .unwrap();

        assert_eq!(targets(&compiled), (vec!["X".to_owned()], "X".to_owned()));
    }

    #[test]
    fn surplus_choice_edges_are_reported() {
        let compiled = compile(choice_graph(
            json!([]),
            json!([
                { "id": "e0", "source": "a", "target": "c" },
                { "id": "e1", "source": "c", "target": "x" },
                { "id": "e2", "source": "c", "target": "y" },
                { "id": "e3", "source": "c", "target": "z" }
            ]),
        ))
        .unwrap();

        assert_eq!(targets(&compiled), (vec!["X".to_owned()], "Y".to_owned()));
        assert!(matches!(
            compiled.diagnostics.as_slice(),
            [Diagnostic::IgnoredEdge { edge, .. }] if edge.as_str() == "e3"
        ));
    }

    #[test]
    fn choice_without_edges_is_fatal() {
        let result = compile(choice_graph(
            json!([]),
            json!([{ "id": "e0", "source": "a", "target": "c" }]),
        ));
        assert!(matches!(result, Err(CompileError::UnroutedChoice(_))));
    }

    #[test]
    fn multiple_entry_points_are_fatal() {
        let result = compile(json!({
            "nodes": [
                { "id": "a", "role": "compute" },
                { "id": "b", "role": "compute" }
            ]
        }));
        assert!(matches!(
            result,
            Err(CompileError::MultipleEntryPoints(ids)) if ids.len() == 2
        ));
    }

    #[test]
    fn edges_out_of_terminal_states_are_ignored() {
        let compiled = compile(json!({
            "nodes": [
                { "id": "a", "role": "compute", "label": "A" },
                { "id": "s", "role": "flow-control", "control": "succeed", "label": "S" },
                { "id": "b", "role": "flow-control", "control": "pass", "label": "B" }
            ],
            "edges": [
                { "id": "e1", "source": "a", "target": "s" },
                { "id": "e2", "source": "s", "target": "b" }
            ]
        }));
        // `b` only has an incoming link from a terminal state, which still
        // counts, so the entry point stays unique.
        let compiled = compiled.unwrap();
        assert_eq!(compiled.workflow.start_at, "A");
        assert!(matches!(
            compiled.workflow.state("S"),
            Some(WorkflowState::Succeed(_))
        ));
        assert!(matches!(
            compiled.diagnostics.as_slice(),
            [Diagnostic::IgnoredEdge { edge, .. }] if edge.as_str() == "e2"
        ));
    }

    #[test]
    fn dual_source_map_exits_share_successor() {
        let compiled = compile(json!({
            "nodes": [
                { "id": "a", "role": "compute", "label": "A" },
                {
                    "id": "m", "role": "flow-control", "control": "map", "label": "Each",
                    "configuration": {
                        "dualSource": true,
                        "externalItemsPath": "$.payload.s3Items"
                    }
                },
                { "id": "z", "role": "compute", "label": "Z" }
            ],
            "edges": [
                { "id": "e1", "source": "a", "target": "m" },
                { "id": "e2", "source": "m", "target": "z" }
            ]
        }))
        .unwrap();

        let workflow = &compiled.workflow;
        assert_eq!(workflow.states.len(), 5);
        assert_eq!(workflow.state("A").unwrap().next(), Some("Each"));

        let dispatch = workflow.state("Each").unwrap().as_choice().unwrap();
        assert_eq!(dispatch.choices[0].next.state_name(), Some("Each (inline)"));
        assert_eq!(dispatch.default.state_name(), Some("Each (external)"));

        let inline = workflow.state("Each (inline)").unwrap().as_map().unwrap();
        let external = workflow.state("Each (external)").unwrap().as_map().unwrap();
        assert_eq!(inline.items_path, "$.payload.data.items");
        assert_eq!(external.items_path, "$.payload.s3Items");
        assert_eq!(inline.transition.next(), Some("Z"));
        assert_eq!(external.transition.next(), Some("Z"));
    }
}

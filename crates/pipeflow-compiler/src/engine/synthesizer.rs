//! Per-node workflow state synthesis.

use serde_json::{Map, Value, json};

use super::compiler::PipelineCompiler;
use super::config::MAX_CONCURRENCY;
use crate::definition::{FlowControl, Node, NodeId, PipelineSettings};
use crate::error::{CompileResult, Diagnostic, Diagnostics};
use crate::graph::{Analysis, StateNames};
use crate::registry::ChainRegistry;
use crate::state::{
    BranchHandle, BranchSlot, ChoiceRule, ChoiceState, ChoiceTarget, ChoiceTest, CompiledWorkflow,
    FailState, MapState, ParallelState, PassState, SucceedState, TaskState, Transition, WaitState,
    WorkflowState,
};

/// Variable tested by the Choice branch synthesized when none is configured.
pub(super) const EXTERNAL_STATUS_VARIABLE: &str = "$.payload.externalJobStatus";

/// Value tested by the Choice branch synthesized when none is configured.
pub(super) const EXTERNAL_STATUS_COMPLETED: &str = "Completed";

const DEFAULT_WAIT_SECONDS: u64 = 1;
const DEFAULT_FAIL_ERROR: &str = "PipelineFailed";
const DEFAULT_FAIL_CAUSE: &str = "Pipeline execution failed";

/// Read-only inputs shared by every node of one workflow compile.
pub(super) struct Scope<'s> {
    pub analysis: &'s Analysis<'s>,
    pub names: &'s StateNames,
    /// Node receiving execution context parameters, if any.
    pub first_compute: Option<&'s NodeId>,
    pub settings: &'s PipelineSettings,
}

/// States emitted for one node.
#[derive(Debug)]
pub(super) struct NodeStates {
    /// The state other nodes transition to.
    pub primary: String,
    /// Every emitted state, primary first.
    pub states: Vec<(String, WorkflowState)>,
    /// States whose transition continues to the node's successor.
    pub exits: Vec<String>,
}

impl NodeStates {
    fn single(name: &str, state: WorkflowState) -> Self {
        Self {
            primary: name.to_owned(),
            states: vec![(name.to_owned(), state)],
            exits: vec![name.to_owned()],
        }
    }
}

impl PipelineCompiler<'_> {
    /// Synthesizes the states of one top-level node.
    pub(super) fn synthesize(
        &self,
        node: &Node,
        scope: &Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> CompileResult<NodeStates> {
        let name = scope.names.name_of(&node.id)?;

        let state = match node.flow_control() {
            None => self.task_state(node, scope, diagnostics),
            Some(FlowControl::Map) => return self.map_states(node, name, scope, diagnostics),
            Some(FlowControl::Choice) => WorkflowState::Choice(choice_state(node, diagnostics)),
            Some(FlowControl::Parallel) => {
                WorkflowState::Parallel(parallel_state(node, diagnostics))
            }
            Some(FlowControl::Wait) => WorkflowState::Wait(WaitState {
                comment: None,
                seconds: wait_seconds(node, diagnostics),
                transition: Transition::End,
            }),
            Some(FlowControl::Pass) => WorkflowState::Pass(PassState {
                comment: None,
                result: node.config("result").cloned(),
                transition: Transition::End,
            }),
            Some(FlowControl::Succeed) => WorkflowState::Succeed(SucceedState::default()),
            Some(FlowControl::Fail) => WorkflowState::Fail(FailState {
                error: node.config_str("error").unwrap_or(DEFAULT_FAIL_ERROR).to_owned(),
                cause: node.config_str("cause").unwrap_or(DEFAULT_FAIL_CAUSE).to_owned(),
            }),
        };

        Ok(NodeStates::single(name, state))
    }

    /// Synthesizes the task of a handle-backed node.
    ///
    /// Without a provisioned handle the node degrades to a Pass state whose
    /// result names the problem.
    fn task_state(
        &self,
        node: &Node,
        scope: &Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> WorkflowState {
        let Some(handle) = self.context.handles.get(&node.id) else {
            diagnostics.push(Diagnostic::MissingHandle {
                node_id: node.id.clone(),
            });
            return WorkflowState::Pass(PassState {
                comment: Some(format!("Compute handle missing for node {}", node.id)),
                result: Some(json!({
                    "error": "MissingHandle",
                    "nodeId": node.id,
                })),
                transition: Transition::End,
            });
        };

        let mut parameters = match node.config("parameters") {
            None => None,
            Some(Value::Object(parameters)) => Some(parameters.clone()),
            Some(_) => {
                diagnostics.push(Diagnostic::InvalidParameter {
                    node_id: node.id.clone(),
                    parameter: "parameters".into(),
                    message: "expected an object, parameters ignored".into(),
                });
                None
            }
        };

        if scope.first_compute == Some(&node.id) {
            let parameters = parameters.get_or_insert_with(Map::new);
            inject_execution_context(parameters);
        } else if let Some(parameters) = parameters.as_mut() {
            parameters.insert("payload.$".into(), json!("$"));
        }

        WorkflowState::Task(TaskState {
            comment: None,
            resource: handle.clone(),
            parameters,
            retry: self.config.retriers(scope.settings),
            transition: Transition::End,
        })
    }

    /// Synthesizes a Map node, or the Choice plus two Maps of a dual-source one.
    fn map_states(
        &self,
        node: &Node,
        name: &str,
        scope: &Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> CompileResult<NodeStates> {
        let iterator = self.map_iterator(node, scope, diagnostics)?;
        let map = MapState {
            comment: None,
            items_path: node
                .config_str("itemsPath")
                .unwrap_or(self.config.default_items_path.as_str())
                .to_owned(),
            max_concurrency: map_concurrency(node, diagnostics),
            iterator: Box::new(iterator),
            result_path: node.config_str("resultPath").map(str::to_owned),
            transition: Transition::End,
        };

        if !node.is_dual_source() {
            return Ok(NodeStates::single(name, WorkflowState::Map(map)));
        }

        let inline = StateNames::variant(name, "inline");
        let external = StateNames::variant(name, "external");
        let external_map = MapState {
            items_path: node
                .config_str("externalItemsPath")
                .unwrap_or(self.config.external_items_path.as_str())
                .to_owned(),
            ..map.clone()
        };
        let dispatch = ChoiceState {
            comment: Some("Dispatch on the source of the item collection".into()),
            choices: vec![ChoiceRule {
                variable: map.items_path.clone(),
                test: ChoiceTest::IsPresent(true),
                next: ChoiceTarget::State(inline.clone()),
            }],
            default: ChoiceTarget::State(external.clone()),
        };

        Ok(NodeStates {
            primary: name.to_owned(),
            states: vec![
                (name.to_owned(), WorkflowState::Choice(dispatch)),
                (inline.clone(), WorkflowState::Map(map)),
                (external.clone(), WorkflowState::Map(external_map)),
            ],
            exits: vec![inline, external],
        })
    }

    /// Compiles the processor chain of a Map node into its iterator.
    fn map_iterator(
        &self,
        node: &Node,
        scope: &Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> CompileResult<CompiledWorkflow> {
        let Some(chain) = scope
            .analysis
            .chain_of(&node.id)
            .filter(|chain| !chain.is_empty())
        else {
            return Ok(CompiledWorkflow::no_op());
        };

        let missing: Vec<&NodeId> = chain
            .iter()
            .filter(|member| !self.context.handles.contains(member))
            .collect();
        if !missing.is_empty() {
            for member in missing {
                diagnostics.push(Diagnostic::MissingHandle {
                    node_id: member.clone(),
                });
            }
            return Ok(CompiledWorkflow::no_op());
        }

        let subgraph = scope.analysis.graph().processor_subgraph(&node.id, chain)?;
        let (iterator, _) =
            self.compile_workflow(&subgraph, &ChainRegistry::default(), true, diagnostics)?;
        Ok(iterator)
    }
}

fn inject_execution_context(parameters: &mut Map<String, Value>) {
    parameters.insert("runId.$".into(), json!("$$.Execution.Name"));
    parameters.insert("workflowId.$".into(), json!("$$.StateMachine.Id"));
    parameters.insert("originalInput.$".into(), json!("$$.Execution.Input"));
    parameters.insert("payload.$".into(), json!("$"));
}

fn choice_state(node: &Node, diagnostics: &mut Diagnostics) -> ChoiceState {
    let pending = |slot| ChoiceTarget::Pending(BranchHandle::new(node.id.clone(), slot));
    let mut choices = Vec::new();

    match node.config("conditions") {
        None => {}
        Some(Value::Array(conditions)) => {
            for (index, condition) in conditions.iter().enumerate() {
                match parse_condition(condition) {
                    Ok((variable, test)) => choices.push(ChoiceRule {
                        variable,
                        test,
                        next: pending(BranchSlot::Condition(index)),
                    }),
                    Err(message) => diagnostics.push(Diagnostic::InvalidParameter {
                        node_id: node.id.clone(),
                        parameter: format!("conditions[{index}]"),
                        message,
                    }),
                }
            }
        }
        Some(_) => diagnostics.push(Diagnostic::InvalidParameter {
            node_id: node.id.clone(),
            parameter: "conditions".into(),
            message: "expected an array of conditions".into(),
        }),
    }

    if choices.is_empty() {
        choices.push(ChoiceRule {
            variable: EXTERNAL_STATUS_VARIABLE.into(),
            test: ChoiceTest::StringEquals(EXTERNAL_STATUS_COMPLETED.into()),
            next: pending(BranchSlot::Condition(0)),
        });
    }

    ChoiceState {
        comment: None,
        choices,
        default: pending(BranchSlot::Default),
    }
}

fn parse_condition(condition: &Value) -> Result<(String, ChoiceTest), String> {
    let variable = condition
        .get("variable")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|variable| variable.starts_with('$'))
        .ok_or("expected a `variable` path starting with `$`")?;

    let test = match condition.get("value") {
        Some(Value::String(value)) => ChoiceTest::StringEquals(value.clone()),
        Some(Value::Number(value)) => ChoiceTest::NumericEquals(value.clone()),
        Some(Value::Bool(value)) => ChoiceTest::BooleanEquals(*value),
        _ => return Err("expected a string, number or boolean `value`".into()),
    };

    Ok((variable.to_owned(), test))
}

fn parallel_state(node: &Node, diagnostics: &mut Diagnostics) -> ParallelState {
    let branches = match node.config("branches") {
        Some(Value::Array(branches)) => branches.clone(),
        other => {
            diagnostics.push(Diagnostic::InvalidParameter {
                node_id: node.id.clone(),
                parameter: "branches".into(),
                message: match other {
                    None => "no branches configured, using none".into(),
                    Some(_) => "expected an array of branch workflows, using none".into(),
                },
            });
            Vec::new()
        }
    };

    ParallelState {
        comment: None,
        branches,
        transition: Transition::End,
    }
}

/// Reads the Wait duration, floored and clamped at zero.
fn wait_seconds(node: &Node, diagnostics: &mut Diagnostics) -> u64 {
    let seconds = match node.config("duration") {
        None => return DEFAULT_WAIT_SECONDS,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match seconds.filter(|s| s.is_finite()) {
        Some(seconds) if seconds <= 0.0 => 0,
        Some(seconds) => seconds.floor() as u64,
        None => {
            diagnostics.push(Diagnostic::InvalidParameter {
                node_id: node.id.clone(),
                parameter: "duration".into(),
                message: format!("not a number, waiting {DEFAULT_WAIT_SECONDS}s"),
            });
            DEFAULT_WAIT_SECONDS
        }
    }
}

/// Reads the Map concurrency cap; zero and absent mean unbounded.
fn map_concurrency(node: &Node, diagnostics: &mut Diagnostics) -> Option<u32> {
    let (key, value) = ["maxConcurrency", "concurrency"]
        .into_iter()
        .find_map(|key| node.config(key).map(|value| (key, value)))?;

    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        Some(0) => None,
        Some(cap) => Some(cap.min(u64::from(MAX_CONCURRENCY)) as u32),
        None => {
            diagnostics.push(Diagnostic::InvalidParameter {
                node_id: node.id.clone(),
                parameter: key.into(),
                message: "expected a non-negative integer, concurrency left unbounded".into(),
            });
            None
        }
    }
}

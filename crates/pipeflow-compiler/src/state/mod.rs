//! Compiled workflow document types.
//!
//! These types serialize to the execution engine's state-machine language:
//! a [`CompiledWorkflow`] is `{StartAt, States}` and every [`WorkflowState`]
//! carries its `Type` tag plus kind-specific fields.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

mod choice;
mod transition;

pub use choice::{BranchHandle, BranchSlot, ChoiceRule, ChoiceState, ChoiceTarget, ChoiceTest};
pub use transition::Transition;

use crate::registry::ComputeHandle;

/// Name of the state emitted for pipelines with nothing to execute.
pub const NO_OP_STATE: &str = "NoOp";

/// An executable workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompiledWorkflow {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Name of the first state to run.
    pub start_at: String,
    /// States keyed by name.
    pub states: BTreeMap<String, WorkflowState>,
    /// Execution timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl CompiledWorkflow {
    /// Creates a workflow consisting of a single terminal no-op state.
    pub fn no_op() -> Self {
        let mut states = BTreeMap::new();
        states.insert(NO_OP_STATE.to_owned(), WorkflowState::Pass(PassState::default()));
        Self {
            comment: None,
            start_at: NO_OP_STATE.to_owned(),
            states,
            timeout_seconds: None,
        }
    }

    /// Returns a state by name.
    pub fn state(&self, name: &str) -> Option<&WorkflowState> {
        self.states.get(name)
    }

    /// Returns the start state.
    pub fn start_state(&self) -> Option<&WorkflowState> {
        self.states.get(&self.start_at)
    }

    /// Follows `Next` transitions from `StartAt`, returning visited state names.
    ///
    /// Stops at the first state without a `Next`, at an unknown name, or
    /// when a state would be visited twice.
    pub fn default_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(self.start_at.as_str());

        while let Some(name) = cursor {
            let Some((name, state)) = self.states.get_key_value(name) else {
                break;
            };
            if !seen.insert(name.as_str()) {
                break;
            }
            path.push(name.as_str());
            cursor = state.next();
        }

        path
    }

    /// Serializes the workflow into a pretty-printed JSON document.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A workflow state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum WorkflowState {
    /// Invokes a compute unit.
    Task(TaskState),
    /// Branches on input values.
    Choice(ChoiceState),
    /// Runs branches concurrently.
    Parallel(ParallelState),
    /// Iterates a nested workflow over an item collection.
    Map(MapState),
    /// Delays execution.
    Wait(WaitState),
    /// Passes input through, optionally replacing it with a static result.
    Pass(PassState),
    /// Ends the execution successfully.
    Succeed(SucceedState),
    /// Ends the execution with an error.
    Fail(FailState),
}

impl WorkflowState {
    /// Returns the engine type name of this state.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Task(_) => "Task",
            Self::Choice(_) => "Choice",
            Self::Parallel(_) => "Parallel",
            Self::Map(_) => "Map",
            Self::Wait(_) => "Wait",
            Self::Pass(_) => "Pass",
            Self::Succeed(_) => "Succeed",
            Self::Fail(_) => "Fail",
        }
    }

    /// Returns the transition of states that have one.
    ///
    /// Choice, Succeed and Fail states route without a `Next`/`End` pair.
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            Self::Task(s) => Some(&s.transition),
            Self::Parallel(s) => Some(&s.transition),
            Self::Map(s) => Some(&s.transition),
            Self::Wait(s) => Some(&s.transition),
            Self::Pass(s) => Some(&s.transition),
            Self::Choice(_) | Self::Succeed(_) | Self::Fail(_) => None,
        }
    }

    /// Returns a mutable reference to the transition of states that have one.
    pub fn transition_mut(&mut self) -> Option<&mut Transition> {
        match self {
            Self::Task(s) => Some(&mut s.transition),
            Self::Parallel(s) => Some(&mut s.transition),
            Self::Map(s) => Some(&mut s.transition),
            Self::Wait(s) => Some(&mut s.transition),
            Self::Pass(s) => Some(&mut s.transition),
            Self::Choice(_) | Self::Succeed(_) | Self::Fail(_) => None,
        }
    }

    /// Returns the `Next` state name, if any.
    pub fn next(&self) -> Option<&str> {
        self.transition().and_then(Transition::next)
    }

    /// Returns whether this state ends the execution.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Succeed(_) | Self::Fail(_) => true,
            Self::Choice(_) => false,
            _ => self.transition().is_some_and(Transition::is_end),
        }
    }

    /// Returns this state as a task, if it is one.
    pub fn as_task(&self) -> Option<&TaskState> {
        match self {
            Self::Task(task) => Some(task),
            _ => None,
        }
    }

    /// Returns this state as a choice, if it is one.
    pub fn as_choice(&self) -> Option<&ChoiceState> {
        match self {
            Self::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    /// Returns this state as a mutable choice, if it is one.
    pub fn as_choice_mut(&mut self) -> Option<&mut ChoiceState> {
        match self {
            Self::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    /// Returns this state as a map, if it is one.
    pub fn as_map(&self) -> Option<&MapState> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// A retry rule attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Retrier {
    /// Error names this rule applies to.
    pub error_equals: Vec<String>,
    /// Seconds before the first retry.
    pub interval_seconds: u32,
    /// Maximum number of retries.
    pub max_attempts: u32,
    /// Multiplier applied to the interval after each retry.
    pub backoff_rate: f64,
}

/// Task state fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Compute unit to invoke.
    pub resource: ComputeHandle,
    /// Invocation parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
    /// Retry rules, evaluated in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(flatten)]
    pub transition: Transition,
}

/// Parallel state fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParallelState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Pre-authored branch workflows, passed through verbatim.
    pub branches: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub transition: Transition,
}

/// Map state fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Path of the item collection in the state input.
    pub items_path: String,
    /// Concurrency cap. Omitted means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<u32>,
    /// Workflow run for every item.
    pub iterator: Box<CompiledWorkflow>,
    /// Where the collected results are placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(flatten)]
    pub transition: Transition,
}

/// Wait state fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Delay in whole seconds.
    pub seconds: u64,
    #[serde(flatten)]
    pub transition: Transition,
}

/// Pass state fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PassState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Static result replacing the state input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(flatten)]
    pub transition: Transition,
}

/// Succeed state fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SucceedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Fail state fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailState {
    /// Error name.
    pub error: String,
    /// Human-readable cause.
    pub cause: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pass_to(next: &str) -> WorkflowState {
        WorkflowState::Pass(PassState {
            transition: Transition::Next(next.to_owned()),
            ..Default::default()
        })
    }

    #[test]
    fn no_op_is_single_terminal_pass() {
        let workflow = CompiledWorkflow::no_op();
        assert_eq!(workflow.states.len(), 1);
        assert!(workflow.start_state().unwrap().is_terminal());
        assert_eq!(
            serde_json::to_value(&workflow).unwrap(),
            json!({ "StartAt": "NoOp", "States": { "NoOp": { "Type": "Pass", "End": true } } })
        );
    }

    #[test]
    fn default_path_follows_next_and_stops_on_cycles() {
        let mut states = BTreeMap::new();
        states.insert("A".to_owned(), pass_to("B"));
        states.insert("B".to_owned(), pass_to("A"));
        let workflow = CompiledWorkflow {
            comment: None,
            start_at: "A".into(),
            states,
            timeout_seconds: None,
        };
        assert_eq!(workflow.default_path(), vec!["A", "B"]);
    }

    #[test]
    fn task_serializes_engine_shape() {
        let state = WorkflowState::Task(TaskState {
            comment: None,
            resource: ComputeHandle::from("arn:fn"),
            parameters: None,
            retry: vec![Retrier {
                error_equals: vec!["States.ALL".into()],
                interval_seconds: 2,
                max_attempts: 3,
                backoff_rate: 2.0,
            }],
            transition: Transition::Next("Done".into()),
        });

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "Type": "Task",
                "Resource": "arn:fn",
                "Retry": [{
                    "ErrorEquals": ["States.ALL"],
                    "IntervalSeconds": 2,
                    "MaxAttempts": 3,
                    "BackoffRate": 2.0
                }],
                "Next": "Done"
            })
        );
    }

    #[test]
    fn terminal_kinds() {
        assert!(WorkflowState::Succeed(SucceedState::default()).is_terminal());
        assert!(!pass_to("x").is_terminal());
        assert_eq!(pass_to("x").next(), Some("x"));
    }
}

//! Choice state types and deferred branch targets.

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::definition::NodeId;

/// Choice state fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Branch rules, evaluated in order.
    pub choices: Vec<ChoiceRule>,
    /// Target when no rule matches.
    pub default: ChoiceTarget,
}

impl ChoiceState {
    /// Returns whether every branch and the default have a concrete target.
    pub fn is_resolved(&self) -> bool {
        self.default.is_resolved() && self.choices.iter().all(|rule| rule.next.is_resolved())
    }
}

/// A single Choice branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceRule {
    /// Input path the test is applied to.
    pub variable: String,
    /// Comparison applied to the variable.
    #[serde(flatten)]
    pub test: ChoiceTest,
    /// Target when the test matches.
    pub next: ChoiceTarget,
}

/// Comparison operators, serialized as `"<Operator>": <operand>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChoiceTest {
    StringEquals(String),
    NumericEquals(serde_json::Number),
    BooleanEquals(bool),
    IsPresent(bool),
}

/// Which placeholder of a Choice node a handle stands for.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchSlot {
    /// The branch of the configured condition at this index.
    #[display("condition-{_0}")]
    Condition(usize),
    /// The default branch.
    #[display("default")]
    Default,
}

/// Node-scoped placeholder for a branch target, resolved by the linker.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
#[display("{node}::{slot}")]
pub struct BranchHandle {
    /// The Choice node owning the placeholder.
    pub node: NodeId,
    /// The placeholder slot.
    pub slot: BranchSlot,
}

impl BranchHandle {
    /// Creates a branch handle.
    pub fn new(node: NodeId, slot: BranchSlot) -> Self {
        Self { node, slot }
    }
}

/// A Choice branch target: a placeholder until linking, then a state name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceTarget {
    /// Awaiting resolution by the linker.
    Pending(BranchHandle),
    /// A concrete state name.
    State(String),
}

impl ChoiceTarget {
    /// Returns whether the target is a concrete state name.
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Returns the state name of a resolved target.
    pub fn state_name(&self) -> Option<&str> {
        match self {
            Self::State(name) => Some(name),
            Self::Pending(_) => None,
        }
    }
}

impl fmt::Display for ChoiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(name) => f.write_str(name),
            Self::Pending(handle) => write!(f, "{handle}"),
        }
    }
}

impl Serialize for ChoiceTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChoiceTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::State)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pending_targets_render_as_scoped_placeholders() {
        let handle = BranchHandle::new(NodeId::from("check"), BranchSlot::Condition(1));
        assert_eq!(ChoiceTarget::Pending(handle).to_string(), "check::condition-1");

        let handle = BranchHandle::new(NodeId::from("check"), BranchSlot::Default);
        assert_eq!(ChoiceTarget::Pending(handle).to_string(), "check::default");
    }

    #[test]
    fn rule_serializes_operator_inline() {
        let rule = ChoiceRule {
            variable: "$.payload.status".into(),
            test: ChoiceTest::StringEquals("Completed".into()),
            next: ChoiceTarget::State("Publish".into()),
        };

        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "Variable": "$.payload.status",
                "StringEquals": "Completed",
                "Next": "Publish"
            })
        );
    }

    #[test]
    fn resolution_requires_every_target() {
        let mut choice = ChoiceState {
            comment: None,
            choices: vec![ChoiceRule {
                variable: "$.x".into(),
                test: ChoiceTest::BooleanEquals(true),
                next: ChoiceTarget::State("A".into()),
            }],
            default: ChoiceTarget::Pending(BranchHandle::new(
                NodeId::from("c"),
                BranchSlot::Default,
            )),
        };
        assert!(!choice.is_resolved());

        choice.default = ChoiceTarget::State("B".into());
        assert!(choice.is_resolved());
    }
}

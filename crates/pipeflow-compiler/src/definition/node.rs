//! Node definition types.

use std::borrow::Borrow;

use derive_builder::Builder;
use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::{FlowControl, RuleKind};

/// Free-form node configuration as authored in the pipeline editor.
pub type Configuration = serde_json::Map<String, Value>;

/// Unique identifier for a node in a pipeline graph.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID from any string-like value.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The role a node plays in the pipeline.
///
/// Serialized inline with the node as `"role": "<role>"`, with the
/// role-specific kind next to it:
///
/// ```json
/// { "id": "a", "role": "trigger", "rule": "ingest-completed" }
/// { "id": "b", "role": "flow-control", "control": "choice" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum NodeRole {
    /// Starts executions when a matching event arrives.
    Trigger {
        /// Event rule the trigger subscribes to.
        rule: RuleKind,
    },
    /// A step backed by an invocable compute unit.
    Compute,
    /// Routing, iteration or timing control.
    FlowControl {
        /// The flow-control kind.
        control: FlowControl,
    },
    /// A step calling an external service through a compute unit.
    Integration,
}

/// A pipeline node definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    name = "NodeBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with")
)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// Display label, used to derive the state name.
    #[serde(default)]
    #[builder(default)]
    pub label: String,
    /// Role and role-specific kind.
    #[serde(flatten)]
    pub role: NodeRole,
    /// Node configuration.
    #[serde(default, skip_serializing_if = "Configuration::is_empty")]
    #[builder(default)]
    pub configuration: Configuration,
}

impl Node {
    /// Creates a new node with the given role and no configuration.
    pub fn new(id: impl Into<NodeId>, role: NodeRole) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            role,
            configuration: Configuration::new(),
        }
    }

    /// Returns a builder for creating a node.
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// Returns whether this is a trigger node.
    pub const fn is_trigger(&self) -> bool {
        matches!(self.role, NodeRole::Trigger { .. })
    }

    /// Returns whether this is a compute node.
    pub const fn is_compute(&self) -> bool {
        matches!(self.role, NodeRole::Compute)
    }

    /// Returns whether this is an integration node.
    pub const fn is_integration(&self) -> bool {
        matches!(self.role, NodeRole::Integration)
    }

    /// Returns whether this node is backed by a compute handle.
    pub const fn is_handle_backed(&self) -> bool {
        matches!(self.role, NodeRole::Compute | NodeRole::Integration)
    }

    /// Returns the flow-control kind, if this is a flow-control node.
    pub const fn flow_control(&self) -> Option<FlowControl> {
        match self.role {
            NodeRole::FlowControl { control } => Some(control),
            _ => None,
        }
    }

    /// Returns the rule kind, if this is a trigger node.
    pub const fn rule(&self) -> Option<RuleKind> {
        match self.role {
            NodeRole::Trigger { rule } => Some(rule),
            _ => None,
        }
    }

    /// Returns whether this is a Map node reading items from two sources.
    pub fn is_dual_source(&self) -> bool {
        self.flow_control() == Some(FlowControl::Map)
            && self.config_flag("dualSource").unwrap_or(false)
    }

    /// Returns a configuration value, treating `null` as absent.
    pub fn config(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key).filter(|value| !value.is_null())
    }

    /// Returns a non-empty string configuration value.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Returns a boolean configuration value, accepting `"true"`/`"false"` strings.
    pub fn config_flag(&self, key: &str) -> Option<bool> {
        match self.config(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

//! Closed kind enums carried by node roles.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Event rule kinds a trigger node can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RuleKind {
    /// An asset finished ingestion.
    IngestCompleted,
    /// Another pipeline finished an execution.
    PipelineExecutionCompleted,
    /// An existing asset was updated.
    AssetUpdated,
}

/// Flow-control node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FlowControl {
    /// Multi-branch conditional.
    Choice,
    /// Bounded iteration over an item collection.
    Map,
    /// Parallel fan-out over pre-authored branches.
    Parallel,
    /// Fixed delay.
    Wait,
    /// No-op, optionally injecting a static result.
    Pass,
    /// Successful terminal state.
    Succeed,
    /// Failing terminal state.
    Fail,
}

impl FlowControl {
    /// Returns whether states of this kind can never have a successor.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeed | Self::Fail)
    }
}

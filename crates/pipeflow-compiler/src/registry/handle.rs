//! Compute handle registry.

use std::collections::HashMap;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::definition::NodeId;
use crate::error::CompileResult;

/// Opaque reference to a provisioned compute unit.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct ComputeHandle(String);

impl ComputeHandle {
    /// Returns the handle as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComputeHandle {
    fn from(handle: &str) -> Self {
        Self(handle.to_owned())
    }
}

/// In-memory node ID to compute handle table.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    handles: HashMap<NodeId, ComputeHandle>,
}

impl HandleRegistry {
    /// Creates a registry from a JSON value.
    ///
    /// Expects a JSON object with node ID keys and handle strings as values.
    pub fn new(value: serde_json::Value) -> CompileResult<Self> {
        let handles: HashMap<NodeId, ComputeHandle> = serde_json::from_value(value)?;
        Ok(Self { handles })
    }

    /// Retrieves the handle of a node, if one was provisioned.
    pub fn get(&self, node_id: &NodeId) -> Option<&ComputeHandle> {
        self.handles.get(node_id)
    }

    /// Returns whether a handle exists for the node.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.handles.contains_key(node_id)
    }

    /// Inserts or replaces the handle of a node.
    pub fn insert(&mut self, node_id: impl Into<NodeId>, handle: impl Into<ComputeHandle>) {
        self.handles.insert(node_id.into(), handle.into());
    }

    /// Returns the number of registered handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<N, H> FromIterator<(N, H)> for HandleRegistry
where
    N: Into<NodeId>,
    H: Into<ComputeHandle>,
{
    fn from_iter<I: IntoIterator<Item = (N, H)>>(iter: I) -> Self {
        Self {
            handles: iter
                .into_iter()
                .map(|(node, handle)| (node.into(), handle.into()))
                .collect(),
        }
    }
}

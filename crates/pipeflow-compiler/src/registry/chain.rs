//! Processor chain registry.

use std::collections::HashMap;

use crate::definition::NodeId;
use crate::error::CompileResult;

/// In-memory Map node ID to processor chain table.
///
/// A processor chain is the ordered list of node IDs forming a Map node's
/// loop body. Chains are resolved by a separate pass before compilation.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<NodeId, Vec<NodeId>>,
}

impl ChainRegistry {
    /// Creates a registry from a JSON value.
    ///
    /// Expects a JSON object with Map node ID keys and arrays of member node
    /// IDs as values.
    pub fn new(value: serde_json::Value) -> CompileResult<Self> {
        let chains: HashMap<NodeId, Vec<NodeId>> = serde_json::from_value(value)?;
        Ok(Self { chains })
    }

    /// Retrieves the processor chain of a Map node.
    pub fn chain_of(&self, map_id: &NodeId) -> Option<&[NodeId]> {
        self.chains.get(map_id).map(Vec::as_slice)
    }

    /// Records the processor chain of a Map node.
    pub fn insert<I, N>(&mut self, map_id: impl Into<NodeId>, chain: I)
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        self.chains
            .insert(map_id.into(), chain.into_iter().map(Into::into).collect());
    }

    /// Returns an iterator over all recorded chains.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &[NodeId])> {
        self.chains.iter().map(|(id, chain)| (id, chain.as_slice()))
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

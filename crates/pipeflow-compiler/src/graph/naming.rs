//! Workflow state name assignment.

use std::collections::{HashMap, HashSet};

use crate::definition::{Node, NodeId};
use crate::error::{CompileError, CompileResult};

/// Maximum length of a workflow state name, in characters.
pub const MAX_STATE_NAME_LEN: usize = 80;

/// Node ID to unique state name table.
///
/// Names derive from node labels (or IDs when unlabeled), sanitized to
/// `[A-Za-z0-9 _.-]`. A name already taken gets the node ID appended.
///
/// Derived state names ([`StateNames::variant`]) are the only names carrying
/// parentheses, which sanitized labels never contain, so they cannot
/// collide with a node's own name.
#[derive(Debug, Clone, Default)]
pub struct StateNames {
    names: HashMap<NodeId, String>,
    taken: HashSet<String>,
}

impl StateNames {
    /// Assigns names to nodes in the given order.
    ///
    /// Dual-source Map nodes also reserve their two derived variant names.
    pub fn assign<'n>(nodes: impl IntoIterator<Item = &'n Node>) -> CompileResult<Self> {
        let mut names = Self::default();

        for node in nodes {
            let base = match sanitize(&node.label) {
                label if label.is_empty() => sanitize(node.id.as_str()),
                label => label,
            };
            let name = if names.taken.contains(&base) {
                truncate(&format!("{base}-{}", sanitize(node.id.as_str())))
            } else {
                base
            };

            names.reserve(&name)?;
            if node.is_dual_source() {
                names.reserve(&Self::variant(&name, "inline"))?;
                names.reserve(&Self::variant(&name, "external"))?;
            }
            names.names.insert(node.id.clone(), name);
        }

        Ok(names)
    }

    /// Returns the state name of a node.
    pub fn name_of(&self, id: &NodeId) -> CompileResult<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| CompileError::UnknownNode(id.clone()))
    }

    /// Returns the name of a derived state, like `"Resize (inline)"`.
    ///
    /// The base name is shortened so the result stays within
    /// [`MAX_STATE_NAME_LEN`].
    pub fn variant(name: &str, variant: &str) -> String {
        let suffix = format!(" ({variant})");
        let keep = MAX_STATE_NAME_LEN.saturating_sub(suffix.chars().count());
        let base: String = name.chars().take(keep).collect();
        format!("{base}{suffix}")
    }

    fn reserve(&mut self, name: &str) -> CompileResult<()> {
        if self.taken.insert(name.to_owned()) {
            Ok(())
        } else {
            Err(CompileError::StateNameCollision(name.to_owned()))
        }
    }
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            ' ' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    truncate(&cleaned)
}

fn truncate(name: &str) -> String {
    name.chars().take(MAX_STATE_NAME_LEN).collect()
}

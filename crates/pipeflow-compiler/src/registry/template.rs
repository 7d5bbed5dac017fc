//! Trigger template registry.

use std::collections::HashMap;

use serde_json::Value;

use crate::definition::RuleKind;
use crate::error::CompileResult;

/// In-memory rule kind to event-pattern template table.
///
/// Templates are authored externally and may be missing for any rule kind;
/// the trigger compiler falls back to a built-in base pattern when they are.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<RuleKind, Value>,
}

impl TemplateRegistry {
    /// Creates a registry from a JSON value.
    ///
    /// Expects a JSON object with rule kind keys (`"ingest-completed"`, ...)
    /// and template documents as values. Templates are not validated here.
    pub fn new(value: Value) -> CompileResult<Self> {
        let templates: HashMap<RuleKind, Value> = serde_json::from_value(value)?;
        Ok(Self { templates })
    }

    /// Retrieves the template of a rule kind.
    pub fn template_for(&self, rule: RuleKind) -> Option<&Value> {
        self.templates.get(&rule)
    }

    /// Inserts or replaces the template of a rule kind.
    pub fn insert(&mut self, rule: RuleKind, template: Value) {
        self.templates.insert(rule, template);
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

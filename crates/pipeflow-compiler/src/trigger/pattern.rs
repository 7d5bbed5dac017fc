//! Event-matching pattern document.

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured event-matching pattern.
///
/// Nested objects mirror the event envelope; leaves are literal lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct EventPattern(Map<String, Value>);

impl EventPattern {
    /// Returns a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Looks up a nested field by JSON pointer, like `/detail/metadata`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        pointer
            .strip_prefix('/')?
            .split('/')
            .try_fold(None::<&Value>, |current, key| {
                let fields = match current {
                    None => &self.0,
                    Some(value) => value.as_object()?,
                };
                fields.get(key).map(Some)
            })
            .flatten()
    }

    /// Returns the pattern fields.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the pattern into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

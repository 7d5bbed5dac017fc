//! Parameter value normalization.
//!
//! Pattern leaves are always literal lists: comma-bearing strings are split,
//! scalars are wrapped, nested arrays are flattened. Values of format fields
//! are upper-cased.

use serde_json::{Map, Value};

/// Fields whose values name file formats.
pub const FORMAT_FIELDS: [&str; 6] = [
    "Format",
    "format",
    "FileFormat",
    "fileFormat",
    "Extension",
    "extension",
];

/// Suffix of parameters naming an asset type, like `"Video Type"`.
const ASSET_TYPE_SUFFIX: &str = " Type";

/// Returns whether a field holds file formats.
pub fn is_format_field(key: &str) -> bool {
    FORMAT_FIELDS.contains(&key)
}

/// Returns the asset type named by a `"<Asset> Type"` parameter key.
pub fn asset_type(key: &str) -> Option<&str> {
    key.strip_suffix(ASSET_TYPE_SUFFIX)
        .map(str::trim)
        .filter(|asset| !asset.is_empty())
}

/// Normalizes a parameter value.
///
/// Objects are normalized field by field; everything else becomes a list.
pub fn normalize(value: &Value, upper: bool) -> Value {
    match value {
        Value::Object(fields) => Value::Object(normalize_fields(fields, upper)),
        other => Value::Array(normalize_list(other, upper)),
    }
}

fn normalize_fields(fields: &Map<String, Value>, upper: bool) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), normalize(value, upper || is_format_field(key))))
        .collect()
}

/// Normalizes a value into a flat literal list.
pub fn normalize_list(value: &Value, upper: bool) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => split_list(s, upper).into_iter().map(Value::String).collect(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::Object(fields) => vec![Value::Object(normalize_fields(fields, upper))],
                other => normalize_list(other, upper),
            })
            .collect(),
        Value::Object(fields) => vec![Value::Object(normalize_fields(fields, upper))],
        scalar => vec![scalar.clone()],
    }
}

/// Splits a comma-separated string into trimmed, non-empty items.
pub fn split_list(value: &str, upper: bool) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            if upper {
                item.to_uppercase()
            } else {
                item.to_owned()
            }
        })
        .collect()
}

/// Returns whether a value carries nothing to match on.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

//! Template-guided pattern rendering.

use serde_json::{Map, Value, json};

use super::normalize::{asset_type, is_empty, is_format_field, normalize};
use super::pattern::EventPattern;
use crate::definition::{Configuration, RuleKind};
use crate::error::{Diagnostic, Diagnostics};

/// Derived parameter holding the asset type of a `"<Asset> Type"` parameter.
pub const ASSET_TYPE_PARAMETER: &str = "AssetType";

/// Derived parameter holding the formats of a `"<Asset> Type"` parameter.
pub const FORMAT_PARAMETER: &str = "Format";

const ASSET_FIELD: &str = "DigitalSourceAsset";

/// Renders a template against trigger parameters.
///
/// Returns why the template was rejected on failure; unresolved
/// placeholders only drop their field.
pub(super) fn render(
    rule: RuleKind,
    template: &Value,
    params: &Configuration,
    diagnostics: &mut Diagnostics,
) -> Result<EventPattern, String> {
    let Value::Object(template) = template else {
        return Err("template must be a JSON object".into());
    };
    if !template.contains_key("source") {
        return Err("template has no `source` field".into());
    }

    let params = with_derived(params);
    let mut renderer = Renderer {
        rule,
        params: &params,
        diagnostics,
    };
    let rendered = renderer.fields(template, false);
    if !rendered.contains_key("source") {
        return Err("`source` was dropped while rendering".into());
    }

    let pattern = match rule {
        RuleKind::PipelineExecutionCompleted => flatten_execution_envelope(&rendered)?,
        RuleKind::IngestCompleted | RuleKind::AssetUpdated => rendered,
    };
    Ok(EventPattern::from(pattern))
}

/// Adds the derived `AssetType` and `Format` parameters when not given.
fn with_derived(params: &Configuration) -> Configuration {
    let mut all = params.clone();
    for (key, value) in params {
        if let Some(asset) = asset_type(key) {
            all.entry(ASSET_TYPE_PARAMETER)
                .or_insert_with(|| json!(asset));
            all.entry(FORMAT_PARAMETER)
                .or_insert_with(|| value.clone());
        }
    }
    all
}

/// Returns the parameter name of an exact `${Name}` placeholder.
fn placeholder(value: &str) -> Option<&str> {
    value
        .strip_prefix("${")?
        .strip_suffix('}')
        .filter(|name| !name.is_empty() && !name.contains(['{', '}']))
}

struct Renderer<'r> {
    rule: RuleKind,
    params: &'r Configuration,
    diagnostics: &'r mut Diagnostics,
}

impl Renderer<'_> {
    fn fields(&mut self, fields: &Map<String, Value>, upper: bool) -> Map<String, Value> {
        let mut rendered = Map::new();
        for (key, value) in fields {
            if let Some(value) = self.value(value, upper || is_format_field(key)) {
                rendered.insert(key.clone(), value);
            }
        }
        rendered
    }

    /// Renders a value; `None` drops the enclosing field.
    fn value(&mut self, value: &Value, upper: bool) -> Option<Value> {
        match value {
            Value::String(s) => match placeholder(s) {
                Some(name) => self.resolve(name, upper).filter(|value| !is_empty(value)),
                None => Some(value.clone()),
            },
            Value::Array(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) if placeholder(s).is_some() => {
                            match self.value(item, upper) {
                                Some(Value::Array(values)) => rendered.extend(values),
                                Some(value) => rendered.push(value),
                                None => {}
                            }
                        }
                        other => rendered.extend(self.value(other, upper)),
                    }
                }
                (items.is_empty() || !rendered.is_empty()).then_some(Value::Array(rendered))
            }
            Value::Object(fields) => {
                let rendered = self.fields(fields, upper);
                (fields.is_empty() || !rendered.is_empty()).then_some(Value::Object(rendered))
            }
            other => Some(other.clone()),
        }
    }

    fn resolve(&mut self, name: &str, upper: bool) -> Option<Value> {
        match self.params.get(name).filter(|value| !value.is_null()) {
            Some(value) => Some(normalize(value, upper)),
            None => {
                self.diagnostics.push(Diagnostic::UnresolvedPlaceholder {
                    rule: self.rule,
                    name: name.to_owned(),
                });
                None
            }
        }
    }
}

/// Rewrites an execution-completed pattern into a matchable shape.
///
/// The canonical envelope carries assets inside an array of heterogeneous
/// objects; the object carrying `DigitalSourceAsset` is re-projected to
/// `detail.payload.asset` with only its populated fields.
fn flatten_execution_envelope(rendered: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    let mut pattern = Map::new();
    for key in ["source", "detail-type"] {
        if let Some(value) = rendered.get(key) {
            pattern.insert(key.to_owned(), value.clone());
        }
    }

    let detail = rendered.get("detail").and_then(Value::as_object);
    let asset = detail
        .and_then(find_asset)
        .ok_or_else(|| format!("no array element carries `{ASSET_FIELD}`"))?;

    let mut flat = Map::new();
    if let Some(metadata) = detail.and_then(|detail| detail.get("metadata")) {
        flat.insert("metadata".into(), metadata.clone());
    }
    let projected = project_asset(asset);
    if !projected.is_empty() {
        flat.insert(
            "payload".into(),
            json!({ "asset": { ASSET_FIELD: projected } }),
        );
    }
    if !flat.is_empty() {
        pattern.insert("detail".into(), Value::Object(flat));
    }

    Ok(pattern)
}

/// Finds the first array element carrying an asset object.
fn find_asset(fields: &Map<String, Value>) -> Option<&Map<String, Value>> {
    fields.values().find_map(|value| match value {
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get(ASSET_FIELD).and_then(Value::as_object))
            .or_else(|| items.iter().filter_map(Value::as_object).find_map(find_asset)),
        Value::Object(nested) => find_asset(nested),
        _ => None,
    })
}

fn project_asset(asset: &Map<String, Value>) -> Map<String, Value> {
    let mut projected = Map::new();
    if let Some(kind) = asset.get("Type").filter(|value| !is_empty(value)) {
        projected.insert("Type".into(), kind.clone());
    }
    if let Some(format) = asset
        .get("MainRepresentation")
        .and_then(|representation| representation.get("Format"))
        .filter(|value| !is_empty(value))
    {
        projected.insert("MainRepresentation".into(), json!({ "Format": format }));
    }
    projected
}

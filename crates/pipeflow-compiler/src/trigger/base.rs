//! Built-in base patterns per rule kind.

use serde_json::{Map, Value, json};

use super::normalize::{asset_type, is_empty, is_format_field, normalize, normalize_list};
use super::pattern::EventPattern;
use crate::definition::{Configuration, RuleKind};

/// Parameter mapped onto the source pipeline name of execution events.
pub const PIPELINE_NAME_PARAMETER: &str = "Pipeline Name";

/// Event envelope of a rule kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Event source.
    pub source: &'static str,
    /// Event detail type.
    pub detail_type: &'static str,
    /// Path of the asset object inside `detail`.
    pub asset_path: &'static [&'static str],
}

impl Envelope {
    /// Returns the envelope of a rule kind.
    pub const fn of(rule: RuleKind) -> Self {
        match rule {
            RuleKind::IngestCompleted => Self {
                source: "pipeflow.ingest",
                detail_type: "AssetCreated",
                asset_path: &["DigitalSourceAsset"],
            },
            RuleKind::PipelineExecutionCompleted => Self {
                source: "pipeflow.pipeline",
                detail_type: "Pipeline Execution Completed",
                asset_path: &["payload", "asset", "DigitalSourceAsset"],
            },
            RuleKind::AssetUpdated => Self {
                source: "pipeflow.assets",
                detail_type: "AssetUpdated",
                asset_path: &["DigitalSourceAsset"],
            },
        }
    }
}

/// Builds the base pattern of a rule kind and folds parameters into it.
pub fn base_pattern(rule: RuleKind, params: &Configuration) -> EventPattern {
    let envelope = Envelope::of(rule);
    let mut detail = Map::new();

    for (key, value) in params {
        if let Some(asset) = asset_type(key) {
            insert_path(&mut detail, &asset_field(&envelope, &["Type"]), json!([asset]));
            insert_path(
                &mut detail,
                &asset_field(&envelope, &["MainRepresentation", "Format"]),
                Value::Array(normalize_list(value, true)),
            );
        } else if is_format_field(key) {
            insert_path(
                &mut detail,
                &asset_field(&envelope, &["MainRepresentation", "Format"]),
                Value::Array(normalize_list(value, true)),
            );
        } else if rule == RuleKind::PipelineExecutionCompleted && key == PIPELINE_NAME_PARAMETER {
            insert_path(
                &mut detail,
                &["metadata", "pipelineName"],
                Value::Array(normalize_list(value, false)),
            );
        } else {
            insert_path(&mut detail, &[key.as_str()], normalize(value, false));
        }
    }

    let mut pattern = Map::new();
    pattern.insert("source".into(), json!([envelope.source]));
    pattern.insert("detail-type".into(), json!([envelope.detail_type]));
    if !detail.is_empty() {
        pattern.insert("detail".into(), Value::Object(detail));
    }
    EventPattern::from(pattern)
}

fn asset_field<'a>(envelope: &Envelope, field: &[&'a str]) -> Vec<&'a str> {
    envelope
        .asset_path
        .iter()
        .copied()
        .chain(field.iter().copied())
        .collect()
}

/// Inserts a value at a nested path, merging lists already present.
///
/// Empty values are skipped.
fn insert_path(fields: &mut Map<String, Value>, path: &[&str], value: Value) {
    if is_empty(&value) {
        return;
    }
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = fields;
    for key in parents {
        let entry = current
            .entry(*key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }

    if let (Some(Value::Array(existing)), Value::Array(items)) = (current.get_mut(*last), &value) {
        for item in items {
            if !existing.contains(item) {
                existing.push(item.clone());
            }
        }
        return;
    }
    current.insert((*last).to_owned(), value);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Configuration {
        match value {
            Value::Object(fields) => fields,
            _ => Configuration::new(),
        }
    }

    #[test]
    fn ingest_pattern_nests_asset_fields() {
        let pattern = base_pattern(
            RuleKind::IngestCompleted,
            &params(json!({ "Image Type": "jpg, png" })),
        );

        assert_eq!(
            pattern.into_value(),
            json!({
                "source": ["pipeflow.ingest"],
                "detail-type": ["AssetCreated"],
                "detail": {
                    "DigitalSourceAsset": {
                        "Type": ["Image"],
                        "MainRepresentation": { "Format": ["JPG", "PNG"] }
                    }
                }
            })
        );
    }

    #[test]
    fn execution_pattern_uses_payload_path() {
        let pattern = base_pattern(
            RuleKind::PipelineExecutionCompleted,
            &params(json!({ "Video Type": "mp4, mov", "Pipeline Name": "Ingest Video" })),
        );

        let asset = "/detail/payload/asset/DigitalSourceAsset";
        assert_eq!(pattern.pointer(&format!("{asset}/Type")), Some(&json!(["Video"])));
        assert_eq!(
            pattern.pointer(&format!("{asset}/MainRepresentation/Format")),
            Some(&json!(["MP4", "MOV"]))
        );
        assert_eq!(
            pattern.pointer("/detail/metadata/pipelineName"),
            Some(&json!(["Ingest Video"]))
        );
    }

    #[test]
    fn other_parameters_fold_into_detail() {
        let pattern = base_pattern(
            RuleKind::AssetUpdated,
            &params(json!({ "Bucket": "media-in", "Empty": "", "Format": "wav" })),
        );

        assert_eq!(pattern.pointer("/detail/Bucket"), Some(&json!(["media-in"])));
        assert_eq!(pattern.pointer("/detail/Empty"), None);
        assert_eq!(
            pattern.pointer("/detail/DigitalSourceAsset/MainRepresentation/Format"),
            Some(&json!(["WAV"]))
        );
    }

    #[test]
    fn no_parameters_omit_detail() {
        let pattern = base_pattern(RuleKind::AssetUpdated, &Configuration::new());
        assert_eq!(pattern.get("detail"), None);
        assert_eq!(pattern.get("detail-type"), Some(&json!(["AssetUpdated"])));
    }
}

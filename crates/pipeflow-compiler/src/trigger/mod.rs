//! Trigger pattern compilation.
//!
//! A trigger node's configuration is compiled into an [`EventPattern`]
//! matching the events of its rule kind. When a template is registered for
//! the rule kind, the template is rendered against the configuration;
//! otherwise the configuration is folded into a built-in base pattern.
//!
//! Compilation never fails: a malformed template is reported as a
//! [`Diagnostic::TemplateProcessing`] and the base pattern is used instead.

mod base;
mod normalize;
mod pattern;
mod template;

pub use base::{Envelope, PIPELINE_NAME_PARAMETER, base_pattern};
pub use normalize::{FORMAT_FIELDS, is_format_field};
pub use pattern::EventPattern;
pub use template::{ASSET_TYPE_PARAMETER, FORMAT_PARAMETER};

use serde_json::Value;

use crate::TRACING_TARGET;
use crate::definition::{Configuration, RuleKind};
use crate::error::{Diagnostic, Diagnostics};
use crate::registry::TemplateRegistry;

/// Compiles trigger parameters into an event pattern.
///
/// With a template, placeholders are substituted and the envelope of
/// `pipeline-execution-completed` events is flattened. Without one, or when
/// the template is rejected, the base pattern of the rule kind is used.
pub fn compile_pattern(
    rule: RuleKind,
    template: Option<&Value>,
    params: &Configuration,
    diagnostics: &mut Diagnostics,
) -> EventPattern {
    if let Some(template) = template {
        match template::render(rule, template, params, diagnostics) {
            Ok(pattern) => return pattern,
            Err(message) => diagnostics.push(Diagnostic::TemplateProcessing { rule, message }),
        }
    }
    base_pattern(rule, params)
}

/// Compiles trigger patterns using registered templates.
#[derive(Debug, Clone, Copy)]
pub struct TriggerCompiler<'a> {
    templates: &'a TemplateRegistry,
}

impl<'a> TriggerCompiler<'a> {
    /// Creates a trigger compiler over a template registry.
    pub fn new(templates: &'a TemplateRegistry) -> Self {
        Self { templates }
    }

    /// Compiles the parameters of one trigger node.
    pub fn compile(
        &self,
        rule: RuleKind,
        params: &Configuration,
        diagnostics: &mut Diagnostics,
    ) -> EventPattern {
        let template = self.templates.template_for(rule);
        tracing::debug!(
            target: TRACING_TARGET,
            rule = %rule,
            templated = template.is_some(),
            "compiling trigger pattern"
        );
        compile_pattern(rule, template, params, diagnostics)
    }
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
    fn video_type_yields_asset_type_and_formats() {
        let mut diagnostics = Diagnostics::new();
        let pattern = compile_pattern(
            RuleKind::PipelineExecutionCompleted,
            None,
            &params(json!({ "Video Type": "mp4, mov" })),
            &mut diagnostics,
        );

        let asset = "/detail/payload/asset/DigitalSourceAsset";
        assert_eq!(pattern.pointer(&format!("{asset}/Type")), Some(&json!(["Video"])));
        assert_eq!(
            pattern.pointer(&format!("{asset}/MainRepresentation/Format")),
            Some(&json!(["MP4", "MOV"]))
        );
    }

    #[test]
    fn malformed_template_falls_back_to_base() {
        let mut templates = TemplateRegistry::default();
        templates.insert(RuleKind::IngestCompleted, json!("not an object"));
        let compiler = TriggerCompiler::new(&templates);

        let mut diagnostics = Diagnostics::new();
        let pattern = compiler.compile(
            RuleKind::IngestCompleted,
            &params(json!({ "Audio Type": "wav" })),
            &mut diagnostics,
        );

        let audio = params(json!({ "Audio Type": "wav" }));
        assert_eq!(pattern, base_pattern(RuleKind::IngestCompleted, &audio));
        assert!(matches!(
            diagnostics.into_vec().as_slice(),
            [Diagnostic::TemplateProcessing { rule: RuleKind::IngestCompleted, .. }]
        ));
    }

    #[test]
    fn registered_template_is_rendered() {
        let mut templates = TemplateRegistry::default();
        templates.insert(
            RuleKind::AssetUpdated,
            json!({ "source": ["custom.assets"], "detail": { "Kind": "${AssetType}" } }),
        );
        let compiler = TriggerCompiler::new(&templates);

        let mut diagnostics = Diagnostics::new();
        let pattern = compiler.compile(
            RuleKind::AssetUpdated,
            &params(json!({ "Image Type": "png" })),
            &mut diagnostics,
        );

        assert_eq!(pattern.get("source"), Some(&json!(["custom.assets"])));
        assert_eq!(pattern.pointer("/detail/Kind"), Some(&json!(["Image"])));
        assert!(diagnostics.is_empty());
    }
}

//! Pipeline-level execution settings.

use serde::{Deserialize, Serialize};

/// Settings applied to the whole compiled pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Attempts for the generic retry tier of every task.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Initial interval of the generic retry tier, in seconds.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_seconds: u32,
    /// Execution timeout of the whole workflow, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Whether trigger rules are created enabled.
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_interval_seconds: default_retry_interval(),
            timeout_seconds: None,
            auto_start: true,
        }
    }
}

const fn default_retry_attempts() -> u32 {
    3
}

const fn default_retry_interval() -> u32 {
    2
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let settings: PipelineSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings, PipelineSettings::default());
        assert!(settings.auto_start);
    }

    #[test]
    fn reads_camel_case_fields() {
        let settings: PipelineSettings = serde_json::from_value(json!({
            "retryAttempts": 5,
            "timeoutSeconds": 900,
            "autoStart": false
        }))
        .unwrap();

        assert_eq!(settings.retry_attempts, 5);
        assert_eq!(settings.retry_interval_seconds, 2);
        assert_eq!(settings.timeout_seconds, Some(900));
        assert!(!settings.auto_start);
    }
}

//! Compiler configuration.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::definition::PipelineSettings;
use crate::state::Retrier;

/// Upper bound applied to configured Map concurrency.
pub const MAX_CONCURRENCY: u32 = 40;

/// Default inline item collection iterated by Map states.
pub const DEFAULT_ITEMS_PATH: &str = "$.payload.data.items";

/// Default external item collection of dual-source Map states.
pub const DEFAULT_EXTERNAL_ITEMS_PATH: &str = "$.payload.externalItems";

/// Error name matching every error in the generic retry tier.
pub const ALL_ERRORS: &str = "States.ALL";

/// Transient capacity errors retried by the fast tier.
pub const TRANSIENT_ERRORS: [&str; 4] = [
    "Lambda.TooManyRequestsException",
    "Lambda.ServiceException",
    "Lambda.SdkClientException",
    "Lambda.AWSLambdaException",
];

/// Configuration for the pipeline compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    name = "CompilerConfigBuilder",
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Errors retried by the fast tier.
    #[builder(default = "TRANSIENT_ERRORS.map(String::from).to_vec()")]
    pub transient_errors: Vec<String>,

    /// Seconds before the first fast-tier retry.
    #[builder(default = "1")]
    pub transient_interval_seconds: u32,

    /// Maximum fast-tier retries.
    #[builder(default = "6")]
    pub transient_max_attempts: u32,

    /// Interval multiplier shared by both tiers.
    #[builder(default = "2.0")]
    pub backoff_rate: f64,

    /// Items path used when a Map node configures none.
    #[builder(default = "DEFAULT_ITEMS_PATH.to_owned()")]
    pub default_items_path: String,

    /// External items path used when a dual-source Map configures none.
    #[builder(default = "DEFAULT_EXTERNAL_ITEMS_PATH.to_owned()")]
    pub external_items_path: String,
}

impl CompilerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(rate) = self.backoff_rate
            && !(rate.is_finite() && rate >= 1.0)
        {
            return Err("backoff_rate must be a finite number of at least 1.0".into());
        }
        if self.transient_max_attempts == Some(0) {
            return Err("transient_max_attempts must be at least 1".into());
        }
        if self
            .transient_errors
            .as_ref()
            .is_some_and(|errors| errors.is_empty())
        {
            return Err("transient_errors must not be empty".into());
        }
        for path in [&self.default_items_path, &self.external_items_path]
            .into_iter()
            .flatten()
        {
            if !path.starts_with('$') {
                return Err(format!("items path `{path}` must start with `$`"));
            }
        }
        Ok(())
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            transient_errors: TRANSIENT_ERRORS.map(String::from).to_vec(),
            transient_interval_seconds: 1,
            transient_max_attempts: 6,
            backoff_rate: 2.0,
            default_items_path: DEFAULT_ITEMS_PATH.to_owned(),
            external_items_path: DEFAULT_EXTERNAL_ITEMS_PATH.to_owned(),
        }
    }
}

impl CompilerConfig {
    /// Returns a builder for creating a configuration.
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }

    /// Returns the two-tier retry policy of task states.
    ///
    /// The fast tier covers transient capacity errors; the generic tier
    /// covers everything else with the pipeline's own settings.
    pub fn retriers(&self, settings: &PipelineSettings) -> Vec<Retrier> {
        vec![
            Retrier {
                error_equals: self.transient_errors.clone(),
                interval_seconds: self.transient_interval_seconds,
                max_attempts: self.transient_max_attempts,
                backoff_rate: self.backoff_rate,
            },
            Retrier {
                error_equals: vec![ALL_ERRORS.to_owned()],
                interval_seconds: settings.retry_interval_seconds,
                max_attempts: settings.retry_attempts,
                backoff_rate: self.backoff_rate,
            },
        ]
    }
}

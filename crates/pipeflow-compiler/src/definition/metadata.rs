//! Pipeline metadata.

use semver::Version;
use serde::{Deserialize, Serialize};

/// Pipeline metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Pipeline name (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Pipeline description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Pipeline version (semver, optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Tags for organization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PipelineMetadata {
    /// Returns the workflow comment derived from the name and version.
    pub fn comment(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(match &self.version {
            Some(version) => format!("{name} v{version}"),
            None => name.to_owned(),
        })
    }
}

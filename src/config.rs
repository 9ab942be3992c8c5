//! Options a host passes to the transform, usually as JSON.

use serde::Deserialize;

use crate::error::{StaticHasError, StaticHasResult};
use crate::features::FeatureSelector;

/// Name used for the source file when the host does not provide one.
pub const DEFAULT_FILE_NAME: &str = "input.js";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Preset name(s) or an explicit flag table.
    pub features: Option<FeatureSelector>,
    /// Forwarded to the feature resolver.
    pub is_running_in_node: bool,
    pub file_name: Option<String>,
    /// Parse JSX syntax.
    pub jsx: bool,
    /// Append the composed source map to the code as a data URL.
    pub inline_source_map: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            features: None,
            is_running_in_node: true,
            file_name: None,
            jsx: false,
            inline_source_map: false,
        }
    }
}

impl TransformOptions {
    pub fn from_json(json: &str) -> StaticHasResult<Self> {
        serde_json::from_str(json).map_err(StaticHasError::config)
    }

    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(DEFAULT_FILE_NAME)
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CACHED_METADATA_KEY: &str = "cached";

/// Outcome of evaluating a switch.
///
/// `reason` is meant for display and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub result: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl EvaluationResult {
    #[must_use]
    pub fn new(result: bool, reason: impl Into<String>) -> Self {
        Self {
            result,
            reason: Some(reason.into()),
            metadata: None,
        }
    }

    #[must_use]
    pub fn enabled(reason: impl Into<String>) -> Self {
        Self::new(true, reason)
    }

    #[must_use]
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::new(false, reason)
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns `true` if this result was served from the execution cache.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(CACHED_METADATA_KEY))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Tag the result as a cache hit, keeping any metadata already present.
    #[must_use]
    pub fn into_cached(mut self) -> Self {
        let _ = self
            .metadata
            .get_or_insert_with(Map::new)
            .insert(CACHED_METADATA_KEY.to_string(), Value::Bool(true));
        self
    }
}

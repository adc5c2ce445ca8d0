//! Manual overrides consulted before any evaluation.

use crate::model::{EvaluationRequest, EvaluationResult, StrategyType};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;

const LOG_TARGET: &str = "    bypass";

/// A forced value for one key.
///
/// Criteria narrow the override: when the request input does not satisfy a
/// criterion, the forced value is flipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcedKey {
    key: String,
    value: bool,
    metadata: Option<Map<String, Value>>,
    criteria: Vec<(StrategyType, Vec<String>)>,
}

impl ForcedKey {
    #[must_use]
    pub fn new(key: impl Into<String>, value: bool) -> Self {
        Self {
            key: key.into(),
            value,
            metadata: None,
            criteria: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Only honor the forced value when the request's `strategy` input is one of `values`.
    #[must_use]
    pub fn when<I, S>(mut self, strategy: StrategyType, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.push((strategy, values.into_iter().map(Into::into).collect()));
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn value(&self) -> bool {
        self.value
    }

    /// Produce the forced result for `request`.
    #[must_use]
    pub fn respond(&self, request: &EvaluationRequest) -> EvaluationResult {
        let satisfied = self.criteria.iter().all(|(strategy, accepted)| {
            request
                .entry_for(*strategy)
                .is_some_and(|entry| accepted.iter().any(|v| *v == entry.input))
        });

        let result = if satisfied { self.value } else { !self.value };
        let outcome = EvaluationResult::new(result, format!("Forced to {result}"));
        match &self.metadata {
            Some(metadata) => outcome.with_metadata(metadata.clone()),
            None => outcome,
        }
    }
}

/// Concurrent map of forced keys.
#[derive(Debug, Default)]
pub struct Bypasser {
    forced: RwLock<HashMap<String, ForcedKey>>,
}

impl Bypasser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assume(&self, forced: ForcedKey) {
        log::debug!(target: LOG_TARGET, "Forcing '{}' to {}", forced.key, forced.value);
        let _ = self
            .forced
            .write()
            .expect("lock not poisoned")
            .insert(forced.key.clone(), forced);
    }

    pub fn forget(&self, key: &str) {
        let _ = self.forced.write().expect("lock not poisoned").remove(key);
    }

    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<ForcedKey> {
        self.forced.read().expect("lock not poisoned").get(key).cloned()
    }

    pub fn clear(&self) {
        self.forced.write().expect("lock not poisoned").clear();
    }
}

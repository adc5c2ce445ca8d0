use super::StrategyType;
use serde::{Deserialize, Serialize};

/// One piece of input handed to a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entry {
    pub strategy: StrategyType,
    pub input: String,
}

impl Entry {
    #[must_use]
    pub fn new(strategy: StrategyType, input: impl Into<String>) -> Self {
        Self {
            strategy,
            input: input.into(),
        }
    }
}

/// A switch key plus the inputs to evaluate it with.
///
/// Several entries may share a strategy type; only the first one is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationRequest {
    key: String,
    entries: Vec<Entry>,
}

impl EvaluationRequest {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: Vec::new(),
        }
    }

    /// Append an input entry.
    #[must_use]
    pub fn with(mut self, strategy: StrategyType, input: impl Into<String>) -> Self {
        self.push(strategy, input);
        self
    }

    pub fn push(&mut self, strategy: StrategyType, input: impl Into<String>) {
        self.entries.push(Entry::new(strategy, input));
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The first entry supplied for `strategy`, if any.
    #[must_use]
    pub fn entry_for(&self, strategy: StrategyType) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.strategy == strategy)
    }
}

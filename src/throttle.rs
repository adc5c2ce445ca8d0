//! Per-subject memo of evaluation results.
//!
//! A subject is a key together with the *set* of inputs it was evaluated with,
//! so the order and repetition of entries do not matter. [`ExecutionCache`]
//! serves throttled evaluations; [`ExecutionLog`] remembers the last result of
//! every evaluation when execution logging is enabled.

use crate::model::{Entry, EvaluationRequest, EvaluationResult};
use core::time::Duration;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

const LOG_TARGET: &str = "  throttle";

/// Default number of subjects kept by [`ExecutionCache`] and [`ExecutionLog`].
pub const DEFAULT_CAPACITY: usize = 1000;

/// Cache identity of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject {
    key: String,
    entries: Vec<Entry>,
}

impl Subject {
    #[must_use]
    pub fn new(request: &EvaluationRequest) -> Self {
        let mut entries = request.entries().to_vec();
        entries.sort();
        entries.dedup();
        Self {
            key: request.key().to_string(),
            entries,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Nothing cached; evaluate synchronously.
    Miss,

    /// Cached result within its freshness window.
    Fresh(EvaluationResult),

    /// Cached result whose window elapsed; the caller owns the single refresh.
    Stale(EvaluationResult),
}

#[derive(Debug)]
struct CacheEntry {
    result: EvaluationResult,
    next_refresh_at: Instant,
}

/// Bounded cache of throttled results.
#[derive(Debug)]
pub struct ExecutionCache {
    entries: Mutex<HashMap<Subject, CacheEntry>>,
    capacity: usize,
}

impl ExecutionCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Look up `subject`.
    ///
    /// When the entry is due for refresh its deadline moves to `now + delay`
    /// before returning [`Lookup::Stale`], so concurrent callers see it as
    /// fresh and exactly one of them refreshes.
    pub fn lookup(&self, subject: &Subject, delay: Duration, now: Instant) -> Lookup {
        let mut entries = self.entries.lock().expect("lock not poisoned");
        let Some(entry) = entries.get_mut(subject) else {
            log::debug!(target: LOG_TARGET, "Cache miss for '{}'", subject.key);
            return Lookup::Miss;
        };

        let cached = entry.result.clone().into_cached();
        if now >= entry.next_refresh_at {
            entry.next_refresh_at = now + delay;
            log::debug!(target: LOG_TARGET, "Cache entry for '{}' is due for refresh", subject.key);
            Lookup::Stale(cached)
        } else {
            log::debug!(target: LOG_TARGET, "Cache hit for '{}'", subject.key);
            Lookup::Fresh(cached)
        }
    }

    /// Store a completed result, evicting the entry due soonest when full.
    pub fn store(&self, subject: Subject, result: EvaluationResult, next_refresh_at: Instant) {
        let mut entries = self.entries.lock().expect("lock not poisoned");

        if !entries.contains_key(&subject) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.next_refresh_at)
                .map(|(subject, _)| subject.clone());
            if let Some(victim) = victim {
                log::debug!(target: LOG_TARGET, "Evicting '{}' from the execution cache", victim.key);
                let _ = entries.remove(&victim);
            }
        }

        let _ = entries.insert(subject, CacheEntry { result, next_refresh_at });
    }

    /// Replace the result of an existing entry, keeping its deadline.
    pub fn refresh(&self, subject: &Subject, result: EvaluationResult) {
        if let Some(entry) = self.entries.lock().expect("lock not poisoned").get_mut(subject) {
            entry.result = result;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock not poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("lock not poisoned").clear();
    }
}

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub key: String,
    pub entries: Vec<Entry>,
    pub result: EvaluationResult,
}

/// Last result per subject, for inspection.
#[derive(Debug)]
pub struct ExecutionLog {
    state: Mutex<LogState>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct LogState {
    records: HashMap<Subject, (EvaluationResult, u64)>,
    sequence: u64,
}

impl ExecutionLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LogState::default()),
            capacity: capacity.max(1),
        }
    }

    /// Record `result` as the latest execution of `subject`, dropping the
    /// oldest record when full.
    pub fn record(&self, subject: Subject, result: EvaluationResult) {
        let mut state = self.state.lock().expect("lock not poisoned");

        if !state.records.contains_key(&subject) && state.records.len() >= self.capacity {
            let oldest = state
                .records
                .iter()
                .min_by_key(|(_, (_, seq))| *seq)
                .map(|(subject, _)| subject.clone());
            if let Some(oldest) = oldest {
                let _ = state.records.remove(&oldest);
            }
        }

        state.sequence += 1;
        let seq = state.sequence;
        let _ = state.records.insert(subject, (result, seq));
    }

    /// All recorded executions of `key`, oldest first.
    #[must_use]
    pub fn executions(&self, key: &str) -> Vec<Execution> {
        let state = self.state.lock().expect("lock not poisoned");
        let mut found: Vec<_> = state.records.iter().filter(|(subject, _)| subject.key == key).collect();
        found.sort_by_key(|(_, (_, seq))| *seq);

        found
            .into_iter()
            .map(|(subject, (result, _))| Execution {
                key: subject.key.clone(),
                entries: subject.entries.clone(),
                result: result.clone(),
            })
            .collect()
    }

    pub fn clear(&self) {
        self.state.lock().expect("lock not poisoned").records.clear();
    }
}

//! Bounded-time regex matching.
//!
//! A [`RegexGuard`] either matches inline or hands each match to an idle
//! worker thread and waits at most a fixed time limit for the answer. A worker
//! only ever holds one match, so the limit covers that match alone. When the
//! limit is exceeded the worker is abandoned, and the (patterns, input) pair is
//! blacklisted so that repeating it answers `false` without running the match
//! again.

mod blacklist;

use blacklist::Blacklist;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use regex::Regex;
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;

const LOG_TARGET: &str = "     regex";

/// Default upper bound on a single guarded match.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(3000);

/// Default number of remembered timeouts.
pub const DEFAULT_BLACKLIST_CAPACITY: usize = 50;

/// Number of compiled patterns kept by [`default_matcher`].
const PATTERN_CACHE_CAPACITY: usize = 256;

/// Idle workers kept for reuse; extra ones exit once released.
const MAX_IDLE_WORKERS: usize = 4;

/// Returns `true` if any of the patterns matches the input.
pub type MatchFn = Arc<dyn Fn(&[String], &str) -> bool + Send + Sync>;

/// The matcher used unless one is injected.
///
/// Patterns are compiled once and cached. Patterns that fail to compile never match.
#[must_use]
pub fn default_matcher() -> MatchFn {
    let cache = PatternCache::new(PATTERN_CACHE_CAPACITY);
    Arc::new(move |patterns: &[String], input: &str| {
        patterns
            .iter()
            .any(|pattern| cache.compiled(pattern).is_some_and(|re| re.is_match(input)))
    })
}

/// Compiled patterns by source text. A failed compile is remembered as `None`.
struct PatternCache {
    compiled: Mutex<HashMap<String, Option<Regex>>>,
    capacity: usize,
}

impl PatternCache {
    fn new(capacity: usize) -> Self {
        Self {
            compiled: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn compiled(&self, pattern: &str) -> Option<Regex> {
        if let Some(entry) = self.compiled.lock().expect("lock not poisoned").get(pattern) {
            return entry.clone();
        }

        let compiled = match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Ignoring invalid pattern '{pattern}': {e}");
                None
            }
        };

        let mut map = self.compiled.lock().expect("lock not poisoned");
        if map.len() >= self.capacity
            && let Some(victim) = map.keys().next().cloned()
        {
            let _ = map.remove(&victim);
        }
        let _ = map.insert(pattern.to_string(), compiled.clone());
        compiled
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.compiled.lock().expect("lock not poisoned").len()
    }
}

struct Job {
    patterns: Vec<String>,
    input: String,
    reply: mpsc::SyncSender<bool>,
}

/// A worker thread that is not running any match. Dropping it stops the thread.
struct Worker {
    jobs: mpsc::Sender<Job>,
}

struct Guarded {
    matcher: MatchFn,
    limit: Duration,
    idle: Mutex<Vec<Worker>>,
    spawned: AtomicU64,
    blacklist: Mutex<Blacklist>,
}

enum Mode {
    Direct(MatchFn),
    Guarded(Guarded),
}

/// Regex matching with an optional time limit and failure blacklist.
pub struct RegexGuard {
    mode: Mode,
}

impl RegexGuard {
    /// Match inline on the calling thread, without any time limit.
    #[must_use]
    pub fn direct() -> Self {
        Self {
            mode: Mode::Direct(default_matcher()),
        }
    }

    /// Match on a worker thread, giving up after `limit`.
    #[must_use]
    pub fn guarded(limit: Duration, blacklist_capacity: usize) -> Self {
        Self::guarded_with(limit, blacklist_capacity, default_matcher())
    }

    /// Like [`RegexGuard::guarded`], with a custom matcher.
    #[must_use]
    pub fn guarded_with(limit: Duration, blacklist_capacity: usize, matcher: MatchFn) -> Self {
        Self {
            mode: Mode::Guarded(Guarded {
                matcher,
                limit,
                idle: Mutex::new(Vec::new()),
                spawned: AtomicU64::new(0),
                blacklist: Mutex::new(Blacklist::new(blacklist_capacity)),
            }),
        }
    }

    /// Returns `true` if any pattern matches `input`.
    ///
    /// In guarded mode, a blacklisted or timed-out match returns `false`.
    pub fn is_match(&self, patterns: &[String], input: &str) -> bool {
        match &self.mode {
            Mode::Direct(matcher) => matcher(patterns, input),
            Mode::Guarded(guarded) => guarded.is_match(patterns, input),
        }
    }

    /// Number of blacklisted matches currently remembered.
    pub fn blacklist_len(&self) -> usize {
        match &self.mode {
            Mode::Direct(_) => 0,
            Mode::Guarded(guarded) => guarded.blacklist.lock().expect("lock not poisoned").len(),
        }
    }

    pub fn clear_blacklist(&self) {
        if let Mode::Guarded(guarded) = &self.mode {
            guarded.blacklist.lock().expect("lock not poisoned").clear();
        }
    }
}

impl Default for RegexGuard {
    fn default() -> Self {
        Self::guarded(DEFAULT_TIME_LIMIT, DEFAULT_BLACKLIST_CAPACITY)
    }
}

impl fmt::Debug for RegexGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mode {
            Mode::Direct(_) => f.debug_struct("RegexGuard").field("mode", &"direct").finish(),
            Mode::Guarded(guarded) => f
                .debug_struct("RegexGuard")
                .field("mode", &"guarded")
                .field("limit", &guarded.limit)
                .field("blacklisted", &self.blacklist_len())
                .finish(),
        }
    }
}

impl Guarded {
    fn is_match(&self, patterns: &[String], input: &str) -> bool {
        if self.blacklist.lock().expect("lock not poisoned").covers(patterns, input) {
            log::debug!(target: LOG_TARGET, "Skipping blacklisted match for {patterns:?}");
            return false;
        }

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let job = Job {
            patterns: patterns.to_vec(),
            input: input.to_string(),
            reply: reply_tx,
        };

        let Some(worker) = self.dispatch(job) else {
            log::warn!(target: LOG_TARGET, "Regex worker unavailable, matching inline");
            return (self.matcher)(patterns, input);
        };

        match reply_rx.recv_timeout(self.limit) {
            Ok(matched) => {
                self.release(worker);
                matched
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    target: LOG_TARGET,
                    "Match for {patterns:?} exceeded {} ms, blacklisting input",
                    self.limit.as_millis()
                );
                drop(worker);
                self.blacklist.lock().expect("lock not poisoned").insert(patterns, input);
                false
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!(target: LOG_TARGET, "Regex worker stopped unexpectedly");
                false
            }
        }
    }

    /// Hand `job` to an idle worker, starting one if none is idle.
    ///
    /// The returned worker is owned by this match until it is released.
    fn dispatch(&self, job: Job) -> Option<Worker> {
        let idle = self.idle.lock().expect("lock not poisoned").pop();
        let worker = match idle {
            Some(worker) => worker,
            None => self.spawn_worker()?,
        };

        match worker.jobs.send(job) {
            Ok(()) => Some(worker),
            Err(mpsc::SendError(job)) => {
                // idle worker exited; start a fresh one and retry once
                let worker = self.spawn_worker()?;
                worker.jobs.send(job).ok()?;
                Some(worker)
            }
        }
    }

    fn release(&self, worker: Worker) {
        let mut idle = self.idle.lock().expect("lock not poisoned");
        if idle.len() < MAX_IDLE_WORKERS {
            idle.push(worker);
        }
    }

    fn spawn_worker(&self) -> Option<Worker> {
        let (tx, rx) = mpsc::channel::<Job>();
        let matcher = Arc::clone(&self.matcher);
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new().name(format!("switcher-regex-{id}")).spawn(move || {
            while let Ok(job) = rx.recv() {
                let matched = matcher(&job.patterns, &job.input);
                let _ = job.reply.send(matched);
            }
        });

        match spawned {
            Ok(_) => Some(Worker { jobs: tx }),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not start regex worker: {e}");
                None
            }
        }
    }
}

//! The entry point tying cache, resolver, session and overrides together.
//!
//! Every evaluation passes through the same pipeline:
//!
//! 1. forced keys registered with [`Client::assume`] answer immediately;
//! 2. throttled evaluations are served from the execution cache while fresh;
//! 3. otherwise the switch is resolved against the local snapshot or the
//!    remote authority, depending on the options and the session state.

mod switcher;

pub use crate::session::AuthState;
pub use switcher::Switcher;

use crate::bypass::{Bypasser, ForcedKey};
use crate::model::{EvaluationRequest, EvaluationResult, Snapshot};
use crate::notify::ErrorNotifier;
use crate::regex_guard::RegexGuard;
use crate::remote::{HttpRemote, Remote};
use crate::resolver::resolve;
use crate::session::{Route, SessionManager};
use crate::settings::{ClientContext, ClientOptions};
use crate::storage::SnapshotStore;
use crate::throttle::{Execution, ExecutionCache, ExecutionLog, Lookup, Subject};
use crate::{Error, Result};
use core::time::Duration;
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "    client";

/// Interval at which the snapshot file is polled for changes.
const WATCH_INTERVAL: Duration = Duration::from_millis(500);

/// Per-evaluation knobs, usually set through [`Switcher`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluateOptions {
    /// Cache window; `None` or zero evaluates every time.
    pub throttle: Option<Duration>,

    /// Force the remote authority or the local snapshot instead of following `local`.
    pub remote: Option<bool>,

    /// Result to answer when the remote authority fails.
    pub default_result: Option<bool>,

    /// Ask the remote authority for a reason.
    pub detail: bool,
}

/// How [`Client::load_snapshot`] behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSnapshotOptions {
    /// Fetch from the remote authority when the durable copy was never fetched, even in local mode.
    pub fetch_remote: bool,

    /// Reinstall the snapshot file whenever it changes.
    pub watch: bool,
}

#[derive(Debug, Default)]
struct Tasks {
    auto_update: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    context: ClientContext,
    options: ClientOptions,
    session: Arc<SessionManager>,
    guard: RegexGuard,
    bypasser: Bypasser,
    cache: ExecutionCache,
    log: ExecutionLog,
    notifier: ErrorNotifier,
    tasks: Mutex<Tasks>,
}

/// Feature-switch client.
///
/// Cloning is cheap; clones share the snapshot, caches and background tasks.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Create a client talking to the remote authority over HTTP.
    ///
    /// In local mode the HTTP remote is only created when the context carries
    /// every remote field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a required context field is missing
    /// or an option is invalid.
    pub fn build(context: ClientContext, options: ClientOptions) -> Result<Self> {
        let remote: Option<Arc<dyn Remote>> = if !options.local || context.has_remote() {
            Some(Arc::new(HttpRemote::new(&context)?))
        } else {
            None
        };

        Self::assemble(context, options, remote)
    }

    /// Create a client backed by a custom [`Remote`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if an option is invalid.
    pub fn with_remote(context: ClientContext, options: ClientOptions, remote: Arc<dyn Remote>) -> Result<Self> {
        Self::assemble(context, options, Some(remote))
    }

    fn assemble(context: ClientContext, options: ClientOptions, remote: Option<Arc<dyn Remote>>) -> Result<Self> {
        options.validate()?;

        let notifier = ErrorNotifier::new();
        let store = options
            .snapshot_location
            .as_ref()
            .map(|location| SnapshotStore::new(location.clone(), context.environment.clone()));

        let guard = if options.regex_safe {
            RegexGuard::guarded(options.regex_time_limit(), options.regex_max_black_list)
        } else {
            RegexGuard::direct()
        };

        let session = Arc::new(SessionManager::new(remote, options.silent_window()?, store, notifier.clone()));

        log::debug!(
            target: LOG_TARGET,
            "Client for domain '{}' ({}) in {} mode",
            context.domain,
            context.environment,
            if options.local { "local" } else { "remote" }
        );

        Ok(Self {
            inner: Arc::new(Inner {
                cache: ExecutionCache::new(options.throttle_max_entries),
                log: ExecutionLog::new(options.throttle_max_entries),
                context,
                options,
                session,
                guard,
                bypasser: Bypasser::new(),
                notifier,
                tasks: Mutex::new(Tasks::default()),
            }),
        })
    }

    #[must_use]
    pub fn context(&self) -> &ClientContext {
        &self.inner.context
    }

    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Start building an evaluation of `key`.
    #[must_use]
    pub fn switcher(&self, key: impl Into<String>) -> Switcher {
        Switcher::new(self.clone(), key)
    }

    /// Like [`Client::switcher`], checking up front that the key can be evaluated.
    ///
    /// In local mode with a snapshot installed the key must exist in it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty key and
    /// [`Error::UnknownKey`] for a key missing from the local snapshot.
    pub fn prepare(&self, key: impl Into<String>) -> Result<Switcher> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::missing("key"));
        }

        if self.inner.options.local
            && let Some(snapshot) = self.inner.session.snapshot()
            && snapshot.domain().find_config(&key).is_none()
        {
            return Err(Error::UnknownKey(key));
        }

        Ok(self.switcher(key))
    }

    /// Evaluate `request` without throttling.
    ///
    /// # Errors
    ///
    /// See [`Client::evaluate_with`].
    pub async fn evaluate(&self, request: &EvaluationRequest, detail: bool) -> Result<EvaluationResult> {
        let options = EvaluateOptions {
            detail,
            ..EvaluateOptions::default()
        };
        self.evaluate_with(request, &options).await
    }

    /// Evaluate `request`.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] for an empty key, or a remote evaluation without a remote.
    /// - [`Error::UnknownKey`] when the key is not in the local snapshot.
    /// - [`Error::SnapshotLoad`] when resolving locally with no snapshot loaded.
    /// - [`Error::Remote`] / [`Error::Transport`] unless silent mode or a default result absorbs them.
    pub async fn evaluate_with(&self, request: &EvaluationRequest, options: &EvaluateOptions) -> Result<EvaluationResult> {
        if request.key().is_empty() {
            return Err(Error::missing("key"));
        }

        if let Some(forced) = self.inner.bypasser.lookup(request.key()) {
            log::debug!(target: LOG_TARGET, "'{}' is forced to {}", request.key(), forced.value());
            return Ok(forced.respond(request));
        }

        let Some(delay) = options.throttle.filter(|d| !d.is_zero()) else {
            let result = self.inner.compute(request, options).await?;
            self.inner.record(request, &result);
            return Ok(result);
        };

        let subject = Subject::new(request);
        let now = Instant::now();
        match self.inner.cache.lookup(&subject, delay, now) {
            Lookup::Fresh(result) => Ok(result),
            Lookup::Stale(result) => {
                self.spawn_refresh(subject, request.clone(), options.clone());
                Ok(result)
            }
            Lookup::Miss => {
                let result = self.inner.compute(request, options).await?;
                self.inner.cache.store(subject, result.clone(), now + delay);
                self.inner.record(request, &result);
                Ok(result)
            }
        }
    }

    /// Recompute a cached result in the background.
    ///
    /// A failed refresh keeps the cached result, so the default result never replaces it.
    fn spawn_refresh(&self, subject: Subject, request: EvaluationRequest, options: EvaluateOptions) {
        let options = EvaluateOptions {
            default_result: None,
            ..options
        };
        let inner = Arc::clone(&self.inner);
        drop(tokio::spawn(async move {
            match inner.compute(&request, &options).await {
                Ok(result) => {
                    inner.record(&request, &result);
                    inner.cache.refresh(&subject, result);
                }
                Err(e) => inner.notifier.notify(e),
            }
        }));
    }

    /// Load the durable snapshot and install it.
    ///
    /// A never-fetched snapshot (version 0) is fetched from the remote
    /// authority unless the client is local and `fetch_remote` is off. Starts
    /// the file watcher and auto-update when configured. Returns the installed
    /// version.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot file is unusable or the initial fetch fails.
    pub async fn load_snapshot(&self, options: LoadSnapshotOptions) -> Result<u64> {
        let snapshot = match self.inner.session.store() {
            Some(store) => store.load_or_placeholder()?,
            None => Snapshot::placeholder(),
        };
        self.inner.session.install(snapshot);

        if self.snapshot_version() == 0 && (options.fetch_remote || !self.inner.options.local) {
            let _ = self.check_for_update().await?;
        }

        if options.watch || self.inner.options.snapshot_watcher {
            self.watch_snapshot()?;
        }

        if let Some(interval) = self.inner.options.auto_update_interval() {
            self.schedule_auto_update(interval);
        }

        Ok(self.snapshot_version())
    }

    /// Fetch a newer snapshot from the remote authority.
    ///
    /// Returns `true` if a new snapshot was installed.
    ///
    /// # Errors
    ///
    /// Fails on remote failures or if the snapshot cannot be persisted.
    pub async fn check_for_update(&self) -> Result<bool> {
        self.inner.session.refresh_snapshot().await
    }

    /// Check for snapshot updates every `interval` in the background.
    ///
    /// Replaces any previous schedule. Failures go to the error channel.
    pub fn schedule_auto_update(&self, interval: Duration) {
        self.start_auto_update(interval, None);
    }

    /// Like [`Client::schedule_auto_update`], calling `on_update` with each newly installed version.
    pub fn schedule_auto_update_with<F>(&self, interval: Duration, on_update: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.start_auto_update(interval, Some(Box::new(on_update)));
    }

    fn start_auto_update(&self, interval: Duration, on_update: Option<Box<dyn Fn(u64) + Send + Sync>>) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let _ = ticker.tick().await;

            loop {
                let _ = ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };

                match inner.session.refresh_snapshot().await {
                    Ok(true) => {
                        let version = inner.session.snapshot().map_or(0, |s| s.version());
                        log::info!(target: LOG_TARGET, "Auto update installed snapshot version {version}");
                        if let Some(callback) = &on_update {
                            callback(version);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => inner.notifier.notify(e),
                }
            }
        });

        log::debug!(target: LOG_TARGET, "Scheduled snapshot auto update every {interval:?}");
        if let Some(previous) = self.inner.tasks.lock().expect("lock not poisoned").auto_update.replace(handle) {
            previous.abort();
        }
    }

    pub fn terminate_auto_update(&self) {
        if let Some(handle) = self.inner.tasks.lock().expect("lock not poisoned").auto_update.take() {
            log::debug!(target: LOG_TARGET, "Terminating snapshot auto update");
            handle.abort();
        }
    }

    /// Reinstall the snapshot file whenever it changes on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no snapshot location is configured.
    pub fn watch_snapshot(&self) -> Result<()> {
        let Some(store) = self.inner.session.store() else {
            return Err(Error::config("snapshot_location is required to watch the snapshot file"));
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = store.watch(WATCH_INTERVAL, move |outcome| {
            let Some(inner) = weak.upgrade() else {
                return;
            };

            match outcome {
                Ok(snapshot) => inner.session.install(snapshot),
                Err(e) => inner.notifier.notify(e),
            }
        });

        if let Some(previous) = self.inner.tasks.lock().expect("lock not poisoned").watcher.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    pub fn unwatch_snapshot(&self) {
        if let Some(handle) = self.inner.tasks.lock().expect("lock not poisoned").watcher.take() {
            handle.abort();
        }
    }

    /// Stop watching the snapshot file and drop the installed snapshot.
    pub fn unload_snapshot(&self) {
        self.unwatch_snapshot();
        self.inner.session.clear_snapshot();
    }

    /// Stop every background task.
    pub fn shutdown(&self) {
        self.terminate_auto_update();
        self.unwatch_snapshot();
    }

    /// Verify that every key exists, locally or on the remote authority.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeysNotFound`] listing the unknown keys.
    pub async fn check_switchers<S: AsRef<str>>(&self, keys: &[S]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();

        let not_found: Vec<String> = if self.inner.options.local {
            let snapshot = self.inner.loaded_snapshot()?;
            keys.into_iter()
                .filter(|key| snapshot.domain().find_config(key).is_none())
                .collect()
        } else {
            self.inner.session.check_switchers_remote(&keys).await?
        };

        if not_found.is_empty() {
            Ok(())
        } else {
            Err(Error::KeysNotFound(not_found))
        }
    }

    /// Force `forced.key()` to a fixed value until [`Client::forget`] is called.
    pub fn assume(&self, forced: ForcedKey) {
        self.inner.bypasser.assume(forced);
    }

    pub fn forget(&self, key: &str) {
        self.inner.bypasser.forget(key);
    }

    /// Version of the installed snapshot, `0` when none is installed.
    #[must_use]
    pub fn snapshot_version(&self) -> u64 {
        self.inner.session.snapshot().map_or(0, |s| s.version())
    }

    /// Recorded executions of `key`; empty unless the `logger` option is on.
    #[must_use]
    pub fn executions(&self, key: &str) -> Vec<Execution> {
        self.inner.log.executions(key)
    }

    pub fn clear_executions(&self) {
        self.inner.log.clear();
        self.inner.cache.clear();
    }

    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.inner.session.state()
    }

    /// Subscribe to failures that happen in the background or are absorbed by
    /// silent mode and default results.
    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<Arc<Error>> {
        self.inner.notifier.subscribe()
    }
}

impl Inner {
    async fn compute(&self, request: &EvaluationRequest, options: &EvaluateOptions) -> Result<EvaluationResult> {
        if !options.remote.unwrap_or(!self.options.local) {
            return self.resolve_local(request);
        }

        let remote = match self.session.route()? {
            Route::Remote(remote) => remote,
            Route::Local => return self.resolve_local(request),
        };

        match self.session.evaluate_remote(remote.as_ref(), request, options.detail).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if let Some(default) = options.default_result
                    && e.is_remote_failure()
                {
                    self.notifier.notify(e);
                    return Ok(EvaluationResult::new(default, "Default result"));
                }

                self.session.degrade(e)?;
                self.resolve_local(request)
            }
        }
    }

    fn resolve_local(&self, request: &EvaluationRequest) -> Result<EvaluationResult> {
        let snapshot = self.loaded_snapshot()?;
        resolve(&snapshot, request, self.options.restrict_relay, &self.guard)
    }

    fn loaded_snapshot(&self) -> Result<Arc<Snapshot>> {
        self.session
            .snapshot()
            .ok_or_else(|| Error::snapshot("snapshot is not loaded, use load_snapshot()"))
    }

    fn record(&self, request: &EvaluationRequest, result: &EvaluationResult) {
        if self.options.logger {
            self.log.record(Subject::new(request), result.clone());
        }
    }
}

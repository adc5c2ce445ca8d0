//! Token lifecycle, silent mode and snapshot reconciliation.
//!
//! The [`SessionManager`] owns the installed snapshot and the credential used
//! to talk to the remote authority. Its token moves through
//! `Unauthenticated -> Authenticated -> Expired -> Authenticated | Silent`.
//! While silent, evaluations are routed to the local snapshot; once the silent
//! window elapses a background health probe decides when to authenticate again.

mod auth;
mod silent;

pub use auth::{AuthSession, AuthState, Token};
pub use silent::SilentMode;

use crate::model::{EvaluationRequest, EvaluationResult, Snapshot};
use crate::notify::ErrorNotifier;
use crate::remote::Remote;
use crate::storage::SnapshotStore;
use crate::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, RwLock};

const LOG_TARGET: &str = "   session";

/// Where an evaluation should be answered.
#[derive(Debug)]
pub enum Route {
    Remote(Arc<dyn Remote>),
    Local,
}

#[derive(Debug)]
pub struct SessionManager {
    remote: Option<Arc<dyn Remote>>,
    silent: Option<SilentMode>,
    session: Mutex<Option<AuthSession>>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    store: Option<SnapshotStore>,
    notifier: ErrorNotifier,
}

impl SessionManager {
    #[must_use]
    pub fn new(remote: Option<Arc<dyn Remote>>, silent: Option<SilentMode>, store: Option<SnapshotStore>, notifier: ErrorNotifier) -> Self {
        Self {
            remote,
            silent,
            session: Mutex::new(None),
            snapshot: RwLock::new(None),
            store,
            notifier,
        }
    }

    #[must_use]
    pub fn remote(&self) -> Option<&Arc<dyn Remote>> {
        self.remote.as_ref()
    }

    #[must_use]
    pub const fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        AuthState::of(self.session.lock().expect("lock not poisoned").as_ref(), Utc::now())
    }

    fn require_remote(&self) -> Result<&Arc<dyn Remote>> {
        self.remote
            .as_ref()
            .ok_or_else(|| Error::config("remote authority is not configured"))
    }

    /// Authenticate against the remote authority and store the new token.
    ///
    /// # Errors
    ///
    /// Propagates the remote failure; the caller decides whether silent mode absorbs it.
    pub async fn auth(&self) -> Result<String> {
        let remote = self.require_remote()?;
        let response = remote.authenticate().await?;

        let expiry = DateTime::from_timestamp(response.exp, 0).unwrap_or_else(Utc::now);
        log::info!(target: LOG_TARGET, "Authenticated, token valid until {expiry}");

        *self.session.lock().expect("lock not poisoned") = Some(AuthSession {
            token: Token::Bearer(response.token.clone()),
            expiry,
        });
        Ok(response.token)
    }

    /// Return a valid bearer token, authenticating if needed.
    ///
    /// # Errors
    ///
    /// Fails if authentication fails.
    pub async fn ensure_token(&self) -> Result<String> {
        let current = self
            .session
            .lock()
            .expect("lock not poisoned")
            .as_ref()
            .and_then(|s| s.bearer(Utc::now()).map(ToString::to_string));

        match current {
            Some(token) => Ok(token),
            None => self.auth().await,
        }
    }

    /// Decide whether to ask the remote authority or the local snapshot.
    ///
    /// A silent session whose window has elapsed is extended by one window and
    /// a background probe is started; the current evaluation stays local.
    pub fn route(self: &Arc<Self>) -> Result<Route> {
        let remote = Arc::clone(self.require_remote()?);
        let now = Utc::now();

        let expired_silence = {
            let mut session = self.session.lock().expect("lock not poisoned");
            match session.as_mut() {
                Some(s) if s.token == Token::Silent => {
                    if !s.is_expired(now) {
                        return Ok(Route::Local);
                    }
                    if let Some(silent) = self.silent {
                        s.expiry = silent_until(now, silent);
                    }
                    true
                }
                _ => false,
            }
        };

        if expired_silence {
            self.probe();
            return Ok(Route::Local);
        }

        Ok(Route::Remote(remote))
    }

    /// Probe the remote authority's health and authenticate when it is back.
    fn probe(self: &Arc<Self>) {
        let Some(remote) = self.remote.clone() else {
            return;
        };

        log::debug!(target: LOG_TARGET, "Silent window elapsed, probing remote authority");
        let this = Arc::clone(self);
        drop(tokio::spawn(async move {
            if !remote.health().await {
                log::debug!(target: LOG_TARGET, "Remote authority still unhealthy");
                return;
            }

            match this.auth().await {
                Ok(_) => log::info!(target: LOG_TARGET, "Remote authority is back, leaving silent mode"),
                Err(e) => {
                    if let Err(e) = this.degrade(e) {
                        this.notifier.notify(e);
                    }
                }
            }
        }));
    }

    /// Absorb a remote failure by entering silent mode.
    ///
    /// # Errors
    ///
    /// Returns `error` unchanged if silent mode is off or the error is not a
    /// remote failure.
    pub fn degrade(&self, error: Error) -> Result<()> {
        let Some(silent) = self.silent else {
            return Err(error);
        };

        if !error.is_remote_failure() {
            return Err(error);
        }

        let expiry = silent_until(Utc::now(), silent);
        log::info!(target: LOG_TARGET, "Entering silent mode until {expiry}: {error}");
        *self.session.lock().expect("lock not poisoned") = Some(AuthSession {
            token: Token::Silent,
            expiry,
        });

        self.notifier.notify(error);
        Ok(())
    }

    /// Evaluate `request` on the remote authority.
    ///
    /// # Errors
    ///
    /// Fails on authentication or transport failures.
    pub async fn evaluate_remote(&self, remote: &dyn Remote, request: &EvaluationRequest, detail: bool) -> Result<EvaluationResult> {
        let token = self.ensure_token().await?;
        remote.evaluate(&token, request, detail).await
    }

    /// Ask the remote authority which of `keys` it does not know.
    ///
    /// # Errors
    ///
    /// Fails on authentication or transport failures.
    pub async fn check_switchers_remote(&self, keys: &[String]) -> Result<Vec<String>> {
        let remote = self.require_remote()?;
        let token = self.ensure_token().await?;
        remote.check_switchers(&token, keys).await
    }

    /// Fetch a newer snapshot than `local_version`, if there is one.
    ///
    /// # Errors
    ///
    /// Fails on authentication or transport failures.
    pub async fn check_update(&self, local_version: u64) -> Result<Option<Snapshot>> {
        let remote = self.require_remote()?;
        let token = self.ensure_token().await?;

        if remote.check_snapshot_version(&token, local_version).await? {
            log::debug!(target: LOG_TARGET, "Snapshot version {local_version} is current");
            return Ok(None);
        }

        let snapshot = remote.fetch_snapshot(&token).await?;
        Ok(Some(snapshot))
    }

    /// Bring the installed snapshot up to date, persisting it when a store is set.
    ///
    /// Returns `true` if a new snapshot was installed.
    ///
    /// # Errors
    ///
    /// Fails on remote failures or if the snapshot cannot be persisted.
    pub async fn refresh_snapshot(&self) -> Result<bool> {
        let local_version = self.snapshot().map_or(0, |s| s.version());

        let Some(snapshot) = self.check_update(local_version).await? else {
            return Ok(false);
        };

        if let Some(store) = &self.store {
            store.write(&snapshot)?;
        }

        self.install(snapshot);
        Ok(true)
    }

    /// Atomically replace the installed snapshot.
    pub fn install(&self, snapshot: Snapshot) {
        log::info!(target: LOG_TARGET, "Installing snapshot version {}", snapshot.version());
        *self.snapshot.write().expect("lock not poisoned") = Some(Arc::new(snapshot));
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().expect("lock not poisoned").clone()
    }

    pub fn clear_snapshot(&self) {
        *self.snapshot.write().expect("lock not poisoned") = None;
    }
}

/// End of a silent window starting at `now`, saturating at the latest representable instant.
fn silent_until(now: DateTime<Utc>, silent: SilentMode) -> DateTime<Utc> {
    TimeDelta::from_std(silent.duration())
        .ok()
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::AuthResponse;
    use async_trait::async_trait;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use core::time::Duration;

    #[derive(Debug, Default)]
    struct StubRemote {
        down: AtomicBool,
        auth_calls: AtomicUsize,
        latest_version: u64,
    }

    impl StubRemote {
        fn failure(&self) -> Result<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(Error::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Remote for StubRemote {
        async fn authenticate(&self) -> Result<AuthResponse> {
            let _ = self.auth_calls.fetch_add(1, Ordering::SeqCst);
            self.failure()?;
            Ok(AuthResponse {
                token: "token".to_string(),
                exp: Utc::now().timestamp() + 3600,
            })
        }

        async fn check_snapshot_version(&self, _token: &str, version: u64) -> Result<bool> {
            self.failure()?;
            Ok(version == self.latest_version)
        }

        async fn fetch_snapshot(&self, _token: &str) -> Result<Snapshot> {
            self.failure()?;
            Snapshot::from_json(&format!(r#"{{ "data": {{ "domain": {{ "version": {}, "activated": true }} }} }}"#, self.latest_version))
        }

        async fn evaluate(&self, _token: &str, _request: &EvaluationRequest, _show_detail: bool) -> Result<EvaluationResult> {
            self.failure()?;
            Ok(EvaluationResult::enabled("Success"))
        }

        async fn check_switchers(&self, _token: &str, keys: &[String]) -> Result<Vec<String>> {
            self.failure()?;
            Ok(keys.iter().filter(|k| k.starts_with("MISSING")).cloned().collect())
        }

        async fn health(&self) -> bool {
            !self.down.load(Ordering::SeqCst)
        }
    }

    fn manager(remote: Arc<StubRemote>, silent: Option<&str>) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            Some(remote as Arc<dyn Remote>),
            silent.map(|s| s.parse().unwrap()),
            None,
            ErrorNotifier::new(),
        ))
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn token_is_reused_until_expiry() {
        let remote = Arc::new(StubRemote::default());
        let session = manager(Arc::clone(&remote), None);

        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert_eq!(session.ensure_token().await.unwrap(), "token");
        assert_eq!(session.ensure_token().await.unwrap(), "token");
        assert_eq!(remote.auth_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), AuthState::Authenticated);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn degrade_without_silent_mode_propagates() {
        let remote = Arc::new(StubRemote::default());
        remote.down.store(true, Ordering::SeqCst);
        let session = manager(remote, None);

        let err = session.ensure_token().await.unwrap_err();
        let err = session.degrade(err).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(session.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn configuration_errors_are_never_absorbed() {
        let session = manager(Arc::new(StubRemote::default()), Some("5m"));
        let err = session.degrade(Error::missing("key")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn silent_window_routes_locally_then_probes() {
        let remote = Arc::new(StubRemote::default());
        remote.down.store(true, Ordering::SeqCst);
        let session = manager(Arc::clone(&remote), Some("1s"));
        let mut errors = session.notifier.subscribe();

        let err = session.ensure_token().await.unwrap_err();
        session.degrade(err).unwrap();
        assert_eq!(session.state(), AuthState::Silent);
        assert!(errors.recv().await.is_ok());
        assert!(matches!(session.route().unwrap(), Route::Local));

        remote.down.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // the window elapsed: this call is still local but starts a health check
        assert!(matches!(session.route().unwrap(), Route::Local));

        for _ in 0..50 {
            if session.state() == AuthState::Authenticated {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(session.state(), AuthState::Authenticated);
        assert!(matches!(session.route().unwrap(), Route::Remote(_)));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn huge_silent_window_saturates() {
        let remote = Arc::new(StubRemote::default());
        remote.down.store(true, Ordering::SeqCst);
        let session = Arc::new(SessionManager::new(
            Some(remote as Arc<dyn Remote>),
            Some(SilentMode::new(Duration::MAX)),
            None,
            ErrorNotifier::new(),
        ));

        let err = session.ensure_token().await.unwrap_err();
        session.degrade(err).unwrap();
        assert_eq!(session.state(), AuthState::Silent);
        assert!(matches!(session.route().unwrap(), Route::Local));
    }

    #[test]
    fn silent_until_adds_the_window() {
        let now = Utc::now();
        let until = silent_until(now, SilentMode::new(Duration::from_secs(300)));
        assert_eq!(until - now, TimeDelta::seconds(300));

        let until = silent_until(now, SilentMode::new(Duration::from_secs(u64::MAX)));
        assert_eq!(until, DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn refresh_installs_newer_snapshot_once() {
        let remote = Arc::new(StubRemote {
            latest_version: 5,
            ..StubRemote::default()
        });
        let session = manager(remote, None);

        assert!(session.snapshot().is_none());
        assert!(session.refresh_snapshot().await.unwrap());
        assert_eq!(session.snapshot().unwrap().version(), 5);
        assert!(!session.refresh_snapshot().await.unwrap());

        session.clear_snapshot();
        assert!(session.snapshot().is_none());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn remote_key_check() {
        let session = manager(Arc::new(StubRemote::default()), None);
        let missing = session
            .check_switchers_remote(&["FEATURE".to_string(), "MISSING_ONE".to_string()])
            .await
            .unwrap();
        assert_eq!(missing, vec!["MISSING_ONE"]);
    }

    #[test]
    fn routing_requires_a_remote() {
        let session = Arc::new(SessionManager::new(None, None, None, ErrorNotifier::new()));
        assert!(matches!(session.route(), Err(Error::Configuration(_))));
    }
}

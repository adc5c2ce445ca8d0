//! Client context and options, optionally loaded from `switcher.toml`.

use crate::session::SilentMode;
use crate::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// File name probed when no explicit configuration path is given.
pub const SETTINGS_FILE_NAME: &str = "switcher.toml";

fn default_environment() -> String {
    "default".to_string()
}

/// Identifies the client to the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientContext {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub component: Option<String>,

    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            domain: String::new(),
            component: None,
            environment: default_environment(),
        }
    }
}

impl ClientContext {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Returns `true` if every field needed to talk to the remote authority is set.
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.url.is_some() && self.api_key.is_some() && self.component.is_some() && !self.domain.is_empty()
    }

    /// Check the fields needed to talk to the remote authority.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first missing field.
    pub fn require_remote(&self) -> Result<()> {
        if self.url.as_deref().is_none_or(str::is_empty) {
            return Err(Error::missing("API url"));
        }
        if self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::missing("API Key"));
        }
        if self.component.as_deref().is_none_or(str::is_empty) {
            return Err(Error::missing("component"));
        }
        if self.domain.is_empty() {
            return Err(Error::missing("domain"));
        }
        Ok(())
    }
}

/// Behavioral knobs of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Evaluate against the local snapshot instead of the remote authority.
    pub local: bool,

    /// Record the last result of each evaluation for [`crate::Client::executions`].
    pub logger: bool,

    /// Directory holding `<environment>.json` snapshot files.
    pub snapshot_location: Option<Utf8PathBuf>,

    /// Seconds between background snapshot update checks.
    pub snapshot_auto_update_interval: Option<u64>,

    /// Reload the snapshot file whenever it changes on disk.
    pub snapshot_watcher: bool,

    /// Silent-mode window such as `5m`; absent disables silent mode.
    pub silent_mode: Option<String>,

    pub restrict_relay: bool,

    /// Run regex matches on a time-limited worker.
    pub regex_safe: bool,

    pub regex_max_black_list: usize,

    /// Milliseconds a guarded regex match may take.
    pub regex_max_time_limit: u64,

    pub throttle_max_entries: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            local: false,
            logger: false,
            snapshot_location: None,
            snapshot_auto_update_interval: None,
            snapshot_watcher: false,
            silent_mode: None,
            restrict_relay: true,
            regex_safe: true,
            regex_max_black_list: crate::regex_guard::DEFAULT_BLACKLIST_CAPACITY,
            regex_max_time_limit: 3000,
            throttle_max_entries: crate::throttle::DEFAULT_CAPACITY,
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub const fn regex_time_limit(&self) -> Duration {
        Duration::from_millis(self.regex_max_time_limit)
    }

    #[must_use]
    pub fn auto_update_interval(&self) -> Option<Duration> {
        self.snapshot_auto_update_interval.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    /// Parse the silent-mode window, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a malformed window.
    pub fn silent_window(&self) -> Result<Option<SilentMode>> {
        self.silent_mode.as_deref().map(str::parse::<SilentMode>).transpose()
    }

    /// Check option values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first invalid option.
    pub fn validate(&self) -> Result<()> {
        let _ = self.silent_window()?;

        if self.regex_safe && self.regex_max_time_limit == 0 {
            return Err(Error::config("regex_max_time_limit must be greater than zero"));
        }

        if self.throttle_max_entries == 0 {
            return Err(Error::config("throttle_max_entries must be greater than zero"));
        }

        Ok(())
    }
}

/// Context and options as stored in a settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub context: ClientContext,

    #[serde(default)]
    pub options: ClientOptions,
}

impl Settings {
    /// Load settings from `path`, or from `switcher.toml` in `dir` when no path is given.
    ///
    /// A missing default file yields the default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read, parsed or validated.
    pub fn load(dir: &Utf8Path, path: Option<&Utf8Path>) -> Result<Self> {
        Self::load_core(dir, path).map_err(|e| Error::config(format!("{e:#}")))?.validated()
    }

    fn load_core(dir: &Utf8Path, path: Option<&Utf8Path>) -> Result<Self, ohno::AppError> {
        let (final_path, text) = if let Some(path) = path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading switcher settings from {path}"))?;
            (path.to_path_buf(), text)
        } else {
            let candidate = dir.join(SETTINGS_FILE_NAME);
            match fs::read_to_string(&candidate) {
                Ok(text) => (candidate, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading switcher settings from {candidate}")),
            }
        };

        toml::from_str(&text).into_app_err_with(|| format!("parsing TOML settings from {final_path}"))
    }

    fn validated(self) -> Result<Self> {
        self.options.validate()?;
        Ok(self)
    }
}

use core::fmt::Display;

/// Failures surfaced by the client.
///
/// Regex timeouts never show up here: a match that runs out of time is
/// reported as a non-match and blacklisted instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required context or option is missing or malformed. Never retried.
    #[error("{0}")]
    Configuration(String),

    /// The key is not present in any group of the snapshot.
    #[error("Unable to load a key {0}")]
    UnknownKey(String),

    /// Some of the keys passed to a key check do not exist.
    #[error("[{}] not found", .0.join(", "))]
    KeysNotFound(Vec<String>),

    /// The remote authority answered with a non-2xx status or a malformed body.
    #[error("remote authority error: {message}")]
    Remote { status: Option<u16>, message: String },

    /// The remote authority could not be reached at all.
    #[error("unable to reach remote authority: {0}")]
    Transport(String),

    /// A snapshot could not be read, parsed or is not loaded yet.
    #[error("snapshot error: {0}")]
    SnapshotLoad(String),
}

impl Error {
    /// Shorthand for the `Missing <field> field` configuration errors.
    pub(crate) fn missing(field: &str) -> Self {
        Self::Configuration(format!("Missing {field} field"))
    }

    pub(crate) fn config(cause: impl Display) -> Self {
        Self::Configuration(cause.to_string())
    }

    pub(crate) fn snapshot(cause: impl Display) -> Self {
        Self::SnapshotLoad(cause.to_string())
    }

    /// Returns `true` for failures talking to the remote authority, the only
    /// kind silent mode and default results are allowed to absorb.
    #[must_use]
    pub const fn is_remote_failure(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() || e.status().is_some() {
            Self::Remote {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        } else {
            Self::Transport(e.to_string())
        }
    }
}

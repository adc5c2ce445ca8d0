use chrono::{DateTime, Utc};

/// Credential currently held by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Bearer(String),

    /// The remote authority failed; evaluations stay local until expiry.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Token,
    pub expiry: DateTime<Utc>,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    /// The bearer token, if one is held and not expired.
    #[must_use]
    pub fn bearer(&self, now: DateTime<Utc>) -> Option<&str> {
        match &self.token {
            Token::Bearer(token) if !self.is_expired(now) => Some(token),
            _ => None,
        }
    }
}

/// Coarse view of the session, for callers and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
    Silent,
}

impl AuthState {
    pub(super) fn of(session: Option<&AuthSession>, now: DateTime<Utc>) -> Self {
        match session {
            Some(AuthSession { token: Token::Silent, .. }) => Self::Silent,
            Some(session) if !session.is_expired(now) => Self::Authenticated,
            _ => Self::Unauthenticated,
        }
    }
}

//! The remote authority the client reconciles against.
//!
//! [`Remote`] is the seam between the session manager and the network;
//! [`HttpRemote`] is the production implementation.

mod http;

pub use http::HttpRemote;

use crate::Result;
use crate::model::{EvaluationRequest, EvaluationResult, Snapshot};
use async_trait::async_trait;
use core::fmt::Debug;
use serde::Deserialize;

/// Token issued by the authenticate call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,

    /// Expiry in seconds since the Unix epoch.
    pub exp: i64,
}

/// Operations offered by the remote authority.
#[async_trait]
pub trait Remote: Send + Sync + Debug {
    async fn authenticate(&self) -> Result<AuthResponse>;

    /// Returns `true` if `version` is the newest snapshot version.
    async fn check_snapshot_version(&self, token: &str, version: u64) -> Result<bool>;

    async fn fetch_snapshot(&self, token: &str) -> Result<Snapshot>;

    async fn evaluate(&self, token: &str, request: &EvaluationRequest, show_detail: bool) -> Result<EvaluationResult>;

    /// Returns the subset of `keys` the remote authority does not know.
    async fn check_switchers(&self, token: &str, keys: &[String]) -> Result<Vec<String>>;

    /// Returns `true` if the remote authority answers its health check.
    async fn health(&self) -> bool;
}

//! switcher-client crate
//!
//! Evaluates feature switches against a snapshot of domain rules, either locally or
//! through a remote authority, and keeps answering when that authority is slow or down.
//!
//! # Module Organization
//!
//! - [`model`]: Snapshot tree, evaluation requests and results
//! - [`strategies`]: Comparison semantics for each strategy type
//! - [`regex_guard`]: Bounded-time regex matching with a failure blacklist
//! - [`resolver`]: Walks a snapshot to decide whether a switch is on
//! - [`session`]: Token lifecycle, silent mode and snapshot reconciliation
//! - [`throttle`]: Per-subject execution cache with background refresh
//! - [`client`]: The entry point tying everything together
//! - [`commands`]: The `switcher` command-line tool
//!
//! # Quick Start
//!
//! ```no_run
//! use switcher_client::{Client, ClientContext, ClientOptions, LoadSnapshotOptions};
//!
//! # async fn demo() -> switcher_client::Result<()> {
//! let options = ClientOptions { local: true, snapshot_location: Some("snapshots".into()), ..ClientOptions::default() };
//! let client = Client::build(ClientContext::new("my-domain"), options)?;
//! let _ = client.load_snapshot(LoadSnapshotOptions::default()).await?;
//!
//! let on = client.switcher("FEATURE01").check_value("USER_1").is_on().await?;
//! # let _ = on;
//! # Ok(())
//! # }
//! ```

/// Result type alias using [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

mod error;

pub mod bypass;
pub mod client;
pub mod commands;
pub mod model;
pub mod notify;
pub mod regex_guard;
pub mod remote;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod storage;
pub mod strategies;
pub mod throttle;

pub use crate::bypass::ForcedKey;
pub use crate::client::{AuthState, Client, EvaluateOptions, LoadSnapshotOptions, Switcher};
pub use crate::error::Error;
pub use crate::model::{Entry, EvaluationRequest, EvaluationResult, Operation, Snapshot, StrategyType};
pub use crate::settings::{ClientContext, ClientOptions, Settings};
pub use crate::throttle::Execution;

//! Snapshot tree, evaluation requests and evaluation results.
//!
//! A [`Snapshot`] mirrors the JSON document served by the remote authority and
//! persisted on disk (`{ "data": { "domain": { ... } } }`). It is immutable once
//! loaded; updates replace it wholesale.

mod evaluation_result;
mod request;
mod snapshot;

pub use evaluation_result::EvaluationResult;
pub use request::{Entry, EvaluationRequest};
pub use snapshot::{Config, Domain, Group, Operation, Relay, Snapshot, StrategyConfig, StrategyType};

//! Comparison semantics for each strategy type.
//!
//! Every operator is a pure function of a [`StrategyConfig`] and one input
//! string. Operations a strategy type does not define evaluate to `false`.

mod date_time;
mod network;
mod numeric;
mod pattern;
mod payload;
mod value;

use crate::model::{StrategyConfig, StrategyType};
use crate::regex_guard::RegexGuard;

pub use payload::flatten_keys;

/// Decide whether `input` satisfies `strategy`.
///
/// Only the REGEX operator consults `guard`.
#[must_use]
pub fn process_operation(strategy: &StrategyConfig, input: &str, guard: &RegexGuard) -> bool {
    let values = strategy.values.as_slice();
    match strategy.strategy {
        StrategyType::Value => value::matches(strategy.operation, values, input),
        StrategyType::Numeric => numeric::matches(strategy.operation, values, input),
        StrategyType::Network => network::matches(strategy.operation, values, input),
        StrategyType::Time => date_time::matches_time(strategy.operation, values, input),
        StrategyType::Date => date_time::matches_date(strategy.operation, values, input),
        StrategyType::Regex => pattern::matches(strategy.operation, values, input, guard),
        StrategyType::Payload => payload::matches(strategy.operation, values, input),
    }
}

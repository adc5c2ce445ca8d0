//! The `switcher` command-line tool.

mod check;
mod common;
mod host;
mod keys;
mod run;
mod update;

pub use check::{CheckArgs, check_switch};
pub use common::{CommonArgs, LogLevel};
pub use host::Host;
pub use keys::{KeysArgs, check_keys};
pub use run::run;
pub use update::{UpdateArgs, update_snapshot};

#[cfg(test)]
pub use host::TestHost;

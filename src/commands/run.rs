//! Command dispatch logic for the switcher CLI

use super::common::init_logging;
use super::{CheckArgs, Host, KeysArgs, UpdateArgs, check_keys, check_switch, update_snapshot};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "switcher", version, author, long_about = None)]
#[command(about = "Evaluate feature switches against local snapshots or a remote authority")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: SwitcherSubcommand,
}

#[derive(Subcommand, Debug)]
enum SwitcherSubcommand {
    /// Evaluate a switch
    Check(Box<CheckArgs>),
    /// Verify that switch keys exist
    Keys(KeysArgs),
    /// Fetch the newest snapshot from the remote authority
    Update(UpdateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Errors
///
/// Returns an error if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<(), ohno::AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        SwitcherSubcommand::Check(check_args) => {
            init_logging(check_args.common.log_level);
            check_switch(host, check_args).await
        }
        SwitcherSubcommand::Keys(keys_args) => {
            init_logging(keys_args.common.log_level);
            check_keys(host, keys_args).await
        }
        SwitcherSubcommand::Update(update_args) => {
            init_logging(update_args.common.log_level);
            update_snapshot(host, update_args).await
        }
    }
}

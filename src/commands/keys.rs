use super::Host;
use super::common::{CommonArgs, build_client, load_settings};
use crate::{Error, LoadSnapshotOptions};
use clap::Args;
use owo_colors::OwoColorize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Keys that must exist
    #[arg(value_name = "KEY", required = true)]
    pub keys: Vec<String>,

    /// Ask the remote authority instead of the local snapshot
    #[arg(long)]
    pub remote: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Verify that every key exists, exiting with 1 when some do not.
pub async fn check_keys<H: Host>(host: &mut H, args: &KeysArgs) -> Result<(), ohno::AppError> {
    let settings = load_settings(&args.common)?;
    let client = build_client(settings, !args.remote)?;

    if !args.remote {
        let _ = client.load_snapshot(LoadSnapshotOptions::default()).await?;
    }

    match client.check_switchers(&args.keys).await {
        Ok(()) => {
            let _ = writeln!(host.output(), "All {} key(s) found", args.keys.len());
            Ok(())
        }
        Err(Error::KeysNotFound(missing)) => {
            for key in &missing {
                let _ = writeln!(host.error(), "{} {key}", "missing".red());
            }
            host.exit(1);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

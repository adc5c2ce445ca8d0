use super::Host;
use super::common::{CommonArgs, build_client, load_settings};
use crate::LoadSnapshotOptions;
use clap::Args;
use ohno::bail;
use std::io::Write;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Fetch the newest snapshot into the snapshot directory.
pub async fn update_snapshot<H: Host>(host: &mut H, args: &UpdateArgs) -> Result<(), ohno::AppError> {
    let settings = load_settings(&args.common)?;
    let Some(location) = settings.options.snapshot_location.clone() else {
        bail!("a snapshot directory is required, use --snapshot-dir or snapshot_location");
    };

    let client = build_client(settings, true)?;
    let before = client.load_snapshot(LoadSnapshotOptions::default()).await?;

    if client.check_for_update().await? {
        let _ = writeln!(
            host.output(),
            "Snapshot updated from version {before} to {} in {location}",
            client.snapshot_version()
        );
    } else {
        let _ = writeln!(host.output(), "Snapshot version {before} is current");
    }

    Ok(())
}

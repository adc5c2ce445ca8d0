use super::Host;
use super::common::{CommonArgs, build_client, load_settings};
use crate::{LoadSnapshotOptions, StrategyType};
use clap::Args;
use owo_colors::OwoColorize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Switch key to evaluate
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Input for VALUE strategies
    #[arg(long, value_name = "VALUE")]
    pub value: Option<String>,

    /// Input for NUMERIC strategies
    #[arg(long, value_name = "NUMBER")]
    pub numeric: Option<String>,

    /// Input for NETWORK strategies (IPv4 address)
    #[arg(long, value_name = "ADDRESS")]
    pub network: Option<String>,

    /// Input for DATE strategies (YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS])
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// Input for TIME strategies (HH:MM[:SS])
    #[arg(long, value_name = "TIME")]
    pub time: Option<String>,

    /// Input for REGEX strategies
    #[arg(long, value_name = "TEXT")]
    pub regex: Option<String>,

    /// Input for PAYLOAD strategies (JSON document)
    #[arg(long, value_name = "JSON")]
    pub payload: Option<String>,

    /// Ask the remote authority instead of the local snapshot
    #[arg(long)]
    pub remote: bool,

    /// Show the reason behind the result
    #[arg(long)]
    pub detail: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl CheckArgs {
    fn inputs(&self) -> impl Iterator<Item = (StrategyType, &str)> {
        [
            (StrategyType::Value, &self.value),
            (StrategyType::Numeric, &self.numeric),
            (StrategyType::Network, &self.network),
            (StrategyType::Date, &self.date),
            (StrategyType::Time, &self.time),
            (StrategyType::Regex, &self.regex),
            (StrategyType::Payload, &self.payload),
        ]
        .into_iter()
        .filter_map(|(strategy, input)| input.as_deref().map(|input| (strategy, input)))
    }
}

/// Evaluate a switch and exit with 0 when it is on, 1 when it is off.
pub async fn check_switch<H: Host>(host: &mut H, args: &CheckArgs) -> Result<(), ohno::AppError> {
    let settings = load_settings(&args.common)?;
    let client = build_client(settings, !args.remote)?;

    if !args.remote {
        let _ = client.load_snapshot(LoadSnapshotOptions::default()).await?;
    }

    let mut switcher = client.switcher(args.key.as_str()).remote(args.remote);
    for (strategy, input) in args.inputs() {
        switcher = switcher.check(strategy, input);
    }

    let result = switcher.is_on_detail().await?;
    let state = if result.result {
        format!("{}", "ON".green().bold())
    } else {
        format!("{}", "OFF".red().bold())
    };

    let _ = writeln!(host.output(), "{} is {state}", args.key);
    if args.detail
        && let Some(reason) = &result.reason
    {
        let _ = writeln!(host.output(), "  reason: {reason}");
    }

    host.exit(i32::from(!result.result));
    Ok(())
}

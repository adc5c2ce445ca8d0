use crate::settings::Settings;
use crate::{Client, ClientOptions};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to a settings file [default: switcher.toml in the current directory]
    #[arg(long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory holding snapshot files
    #[arg(long, value_name = "DIR")]
    pub snapshot_dir: Option<Utf8PathBuf>,

    /// Environment whose snapshot is used
    #[arg(long, value_name = "NAME")]
    pub environment: Option<String>,

    /// Domain name
    #[arg(long, value_name = "NAME")]
    pub domain: Option<String>,

    /// Component name reported to the remote authority
    #[arg(long, value_name = "NAME")]
    pub component: Option<String>,

    /// Base URL of the remote authority
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// API key for the remote authority
    #[arg(long, env = "SWITCHER_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // try_init tolerates a logger installed by an earlier command in the same process
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

/// Merge the settings file with command-line overrides.
pub fn load_settings(args: &CommonArgs) -> Result<Settings, ohno::AppError> {
    let mut settings = Settings::load(Utf8Path::new("."), args.config.as_deref())?;
    let context = &mut settings.context;

    if let Some(environment) = &args.environment {
        context.environment.clone_from(environment);
    }
    if let Some(domain) = &args.domain {
        context.domain.clone_from(domain);
    }
    if args.component.is_some() {
        context.component.clone_from(&args.component);
    }
    if args.url.is_some() {
        context.url.clone_from(&args.url);
    }
    if args.api_key.is_some() {
        context.api_key.clone_from(&args.api_key);
    }
    if args.snapshot_dir.is_some() {
        settings.options.snapshot_location.clone_from(&args.snapshot_dir);
    }

    Ok(settings)
}

/// Build a client from `settings`, with background tasks disabled.
pub fn build_client(settings: Settings, local: bool) -> Result<Client, ohno::AppError> {
    let options = ClientOptions {
        local,
        snapshot_watcher: false,
        snapshot_auto_update_interval: None,
        ..settings.options
    };

    Ok(Client::build(settings.context, options)?)
}

//! Command-line front end for the switcher client.
//!
//! ```bash
//! switcher check FEATURE01 --value USER_1 --snapshot-dir snapshots --domain Business
//! switcher keys FEATURE01 FEATURE02 --snapshot-dir snapshots --domain Business
//! switcher update --url https://api.example.com --domain Business --component web --snapshot-dir snapshots
//! ```
//!
//! Settings are read from `switcher.toml` in the current directory unless `--config` says
//! otherwise; command-line flags override the file. The API key may also come from the
//! `SWITCHER_API_KEY` environment variable.

use std::io::{Write, stderr, stdout};
use switcher_client::commands::{Host, run};

#[derive(Debug)]
struct RealHost;

impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
async fn main() -> Result<(), ohno::AppError> {
    run(&mut RealHost, std::env::args()).await
}

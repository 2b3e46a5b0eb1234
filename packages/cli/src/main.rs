//! nkhonde - savings club management from the command line.
//!
//! Club data lives in a [`store::FileStore`] under the data directory; the
//! signed-in session token sits next to it in `session`. Logs go to stderr so
//! command output can be piped.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (validation, conflict, not signed in, storage failure)

mod cli;
mod commands;
mod session;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = commands::run(cli).await {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` when set, otherwise `info`; `-v` forces `debug`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

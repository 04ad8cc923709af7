use crate::commands::{Command, WasmiApp};
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod display;
mod utils;

#[cfg(test)]
mod tests;

/// Installs a `tracing-subscriber` `fmt` subscriber.
///
/// `RUST_LOG` takes precedence if set; otherwise `-v`/`--verbose` selects
/// `debug`, falling back to `warn` for ordinary runs.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let app = WasmiApp::parse();
    init_tracing(app.verbose());
    app.execute()
}

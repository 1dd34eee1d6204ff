use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod error;
mod gateway;
mod model;
mod notify;
mod settings;
#[cfg(test)]
mod test_support;
mod workflow;

fn main() -> Result<()> {
    let args = cli::RootArgs::parse();
    init_logging(args.global.verbose);
    commands::run(args)
}

/// Route tracing events to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "warn,pbust=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

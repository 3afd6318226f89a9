//! Covgate CLI: coverage aggregation and threshold gating
//!
//! ## Usage
//!
//! ```bash
//! covgate check --coverage coverage.json --lines 90   # Gate on thresholds
//! covgate check --bundle dist/bundle.js --reporter lcov # Gate a bundle
//! covgate partition --pipeline pipeline.json          # Split the transform step
//! covgate extract --bundle dist/bundle.js -o out.json # Pull out the payload
//! ```

use clap::Parser;
use covgate_cli::{
    handlers::{execute_check, execute_extract, execute_partition},
    Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit status for usage and runtime errors, distinct from a failed gate
const ERROR_EXIT_CODE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match run(cli, config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(ERROR_EXIT_CODE)
        }
    }
}

fn run(cli: Cli, config: CliConfig) -> CliResult<u8> {
    match cli.command {
        Commands::Check(args) => execute_check(&config, &args),
        Commands::Partition(args) => execute_partition(&args).map(|()| 0),
        Commands::Extract(args) => execute_extract(&config, &args).map(|()| 0),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
}

/// `RUST_LOG` wins over the `-v`/`-q` derived default
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

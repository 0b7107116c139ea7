//! Dashprobe CLI: run browser-driven verification scenarios
//!
//! ## Usage
//!
//! ```bash
//! dashprobe run                                 # Built-in portal scenario
//! dashprobe run --base-url http://staging:5173  # Against another origin
//! dashprobe run --dry-run                       # In-memory portal, no browser
//! dashprobe validate scenario.yaml              # Check a scenario file
//! dashprobe show                                # Print the steps
//! ```

use clap::Parser;
use dashprobe_cli::{Cli, CliConfig, CliResult, ColorChoice, CommandRunner, Commands, Verbosity};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &CliConfig) -> CliResult<()> {
    let mut runner = CommandRunner::new(config);
    match command {
        Commands::Run(args) => runner.run(&args).await.map(|_| ()),
        Commands::Validate(args) => runner.validate(&args).map(|_| ()),
        Commands::Show(args) => {
            print!("{}", runner.show(&args)?);
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

/// Log to stderr; `RUST_LOG` wins over `-v`/`-q`.
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity.is_verbose())
        .try_init();
}

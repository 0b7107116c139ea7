//! Dashprobe CLI library
//!
//! Command-line surface for running, validating and printing dashprobe
//! scenarios.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, Regression, RunArgs, ShowArgs, ValidateArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use runner::{load_scenario, run_config, CommandRunner};

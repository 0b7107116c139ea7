//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use dashprobe::mock::portal::PortalFixture;
use dashprobe::{LoadState, DEFAULT_BASE_URL};
use std::path::PathBuf;

/// Dashprobe: run browser-driven verification scenarios against a web dashboard
#[derive(Parser, Debug)]
#[command(name = "dashprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario (the built-in portal scenario by default)
    Run(RunArgs),

    /// Check that a scenario file parses and is well-formed
    Validate(ValidateArgs),

    /// Print the steps of a scenario
    Show(ShowArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Scenario file (YAML); the built-in portal scenario when omitted
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Root origin relative URLs are joined to
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Bound for every wait, in milliseconds
    #[arg(long, env = "DASHPROBE_TIMEOUT_MS", default_value = "5000")]
    pub timeout_ms: u64,

    /// Interval between polls, in milliseconds
    #[arg(long, env = "DASHPROBE_POLL_MS", default_value = "100")]
    pub poll_ms: u64,

    /// Page lifecycle signal a navigation waits for
    #[arg(long, value_enum, default_value = "load")]
    pub wait_until: WaitUntilArg,

    /// Path to the chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Override a scenario variable (KEY=VALUE, repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Run against the in-memory portal instead of a browser
    #[arg(long)]
    pub dry_run: bool,

    /// Regressions to switch on in the in-memory portal (with --dry-run)
    #[arg(long, value_enum, requires = "dry_run")]
    pub simulate: Vec<Regression>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (needed in most containers)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario file (YAML)
    pub file: PathBuf,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Scenario file (YAML); the built-in portal scenario when omitted
    pub file: Option<PathBuf>,

    /// Root origin relative URLs are joined to
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

/// Known portal regressions the in-memory portal can reproduce
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regression {
    /// Installments still show the "near expire" status
    NearExpireStatus,
    /// Installments still show the near-due summary card
    NearDueCard,
    /// Picking a start date leaves the end date empty
    NoEndDateAutofill,
    /// Policies without a pay id render "N/A"
    NaPayId,
    /// The customer account is missing
    NoCustomerAccount,
}

impl Regression {
    /// Switch this regression on in `fixture`
    #[must_use]
    pub fn apply(self, fixture: PortalFixture) -> PortalFixture {
        match self {
            Self::NearExpireStatus => fixture.with_near_expire_status(),
            Self::NearDueCard => fixture.with_near_due_card(),
            Self::NoEndDateAutofill => fixture.without_end_date_autofill(),
            Self::NaPayId => fixture.with_na_pay_id(),
            Self::NoCustomerAccount => fixture.without_account("1234567890"),
        }
    }
}

/// Navigation wait argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitUntilArg {
    /// The `load` event
    #[default]
    Load,
    /// The `DOMContentLoaded` event
    DomContentLoaded,
}

impl From<WaitUntilArg> for LoadState {
    fn from(arg: WaitUntilArg) -> Self {
        match arg {
            WaitUntilArg::Load => Self::Load,
            WaitUntilArg::DomContentLoaded => Self::DomContentLoaded,
        }
    }
}

/// Color output argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        fn run_args(args: &[&str]) -> RunArgs {
            let cli = Cli::parse_from(args);
            if let Commands::Run(args) = cli.command {
                args
            } else {
                panic!("expected Run command");
            }
        }

        #[test]
        fn test_parse_run_defaults() {
            let args = run_args(&["dashprobe", "run"]);
            assert!(args.scenario.is_none());
            assert!(!args.dry_run);
            assert!(args.vars.is_empty());
            assert_eq!(args.poll_ms, 100);
            assert_eq!(args.wait_until, WaitUntilArg::Load);
        }

        #[test]
        fn test_parse_run_with_vars() {
            let args = run_args(&[
                "dashprobe",
                "run",
                "--var",
                "SCREENSHOT_PATH=out.png",
                "--var",
                "ADMIN_PASSWORD=secret",
            ]);
            assert_eq!(args.vars.len(), 2);
            assert_eq!(args.vars[0], "SCREENSHOT_PATH=out.png");
        }

        #[test]
        fn test_parse_run_browser_flags() {
            let args = run_args(&[
                "dashprobe",
                "run",
                "--headed",
                "--no-sandbox",
                "--timeout-ms",
                "800",
            ]);
            assert!(args.headed);
            assert!(args.no_sandbox);
            assert_eq!(args.timeout_ms, 800);
        }

        #[test]
        fn test_parse_wait_until() {
            let args = run_args(&["dashprobe", "run", "--wait-until", "dom-content-loaded"]);
            assert_eq!(args.wait_until, WaitUntilArg::DomContentLoaded);
            assert!(Cli::try_parse_from(["dashprobe", "run", "--wait-until", "idle"]).is_err());
        }

        #[test]
        fn test_simulate_requires_dry_run() {
            let result = Cli::try_parse_from(["dashprobe", "run", "--simulate", "na-pay-id"]);
            assert!(result.is_err());
            let args = run_args(&["dashprobe", "run", "--dry-run", "--simulate", "na-pay-id"]);
            assert_eq!(args.simulate, vec![Regression::NaPayId]);
        }

        #[test]
        fn test_parse_validate_command() {
            let cli = Cli::parse_from(["dashprobe", "validate", "portal.yaml"]);
            if let Commands::Validate(args) = cli.command {
                assert_eq!(args.file, PathBuf::from("portal.yaml"));
            } else {
                panic!("expected Validate command");
            }
        }

        #[test]
        fn test_parse_show_without_file() {
            let cli = Cli::parse_from(["dashprobe", "show"]);
            assert!(matches!(cli.command, Commands::Show(ShowArgs { file: None, .. })));
        }

        #[test]
        fn test_global_flags() {
            let cli = Cli::parse_from(["dashprobe", "-vv", "--color", "never", "show"]);
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.color, ColorArg::Never));
        }
    }
}

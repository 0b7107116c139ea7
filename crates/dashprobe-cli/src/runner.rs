//! Command execution

use crate::commands::{RunArgs, ShowArgs, ValidateArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use dashprobe::mock::portal::PortalFixture;
use dashprobe::{
    admin_dashboard_scenario, parse_var, BrowserConfig, RunConfig, RunReport, Scenario,
    ScenarioRunner,
};
use std::path::Path;

/// Runs CLI commands and reports their progress
#[derive(Debug)]
pub struct CommandRunner {
    reporter: ProgressReporter,
}

impl CommandRunner {
    /// Create a new command runner
    #[must_use]
    pub fn new(config: &CliConfig) -> Self {
        Self {
            reporter: ProgressReporter::new(
                config.color.should_color(),
                config.verbosity.is_quiet(),
            ),
        }
    }

    /// Run a scenario and print its outcome.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioFailed` when a step fails, after the report (if
    /// requested) has been written.
    pub async fn run(&mut self, args: &RunArgs) -> CliResult<RunReport> {
        let config = run_config(args)?;
        let scenario = load_scenario(args.scenario.as_deref())?;

        let target = if args.dry_run {
            "in-memory portal"
        } else {
            config.base_url.as_str()
        };
        self.reporter
            .header(&format!("Running {} against {target}", scenario.name));
        for precondition in scenario.preconditions.iter().filter(|p| p.is_assumed()) {
            self.reporter.warning(&format!(
                "precondition {} is assumed, not checked",
                precondition.name
            ));
        }
        self.reporter.start_spinner(&scenario.name);

        let outcome = if args.dry_run {
            let fixture = args
                .simulate
                .iter()
                .fold(PortalFixture::fixed(&config.base_url), |fixture, r| {
                    r.apply(fixture)
                });
            ScenarioRunner::new(fixture.build(), config)
                .run(&scenario)
                .await
                .map_err(CliError::from)
        } else {
            run_in_browser(config, &scenario).await
        };
        self.reporter.finish();
        let report = outcome?;

        for step in &report.steps {
            self.reporter.step(step);
        }
        if let Some(failure) = &report.failure {
            self.reporter.failure_details(failure);
        }
        self.reporter.summary(&report);

        if let Some(path) = &args.report {
            report.write_json(path).await?;
            self.reporter
                .info(&format!("report written to {}", path.display()));
        }

        match &report.failure {
            Some(failure) => Err(CliError::ScenarioFailed {
                scenario: report.scenario.clone(),
                summary: failure.to_string(),
            }),
            None => Ok(report),
        }
    }

    /// Parse and validate a scenario file.
    ///
    /// # Errors
    ///
    /// Returns the parse or validation error.
    pub fn validate(&self, args: &ValidateArgs) -> CliResult<Scenario> {
        let scenario = load_scenario(Some(args.file.as_path()))?;
        let _ = scenario.resolve(dashprobe::DEFAULT_BASE_URL)?;
        self.reporter.success(&format!(
            "{} is valid ({} steps, {} preconditions)",
            args.file.display(),
            scenario.steps.len(),
            scenario.preconditions.len()
        ));
        Ok(scenario)
    }

    /// Outline of a scenario with variables expanded.
    ///
    /// # Errors
    ///
    /// Returns the parse, validation or resolution error.
    pub fn show(&self, args: &ShowArgs) -> CliResult<String> {
        let scenario = load_scenario(args.file.as_deref())?;
        Ok(scenario.resolve(&args.base_url)?.describe())
    }
}

/// Build the run configuration from command-line arguments.
///
/// # Errors
///
/// Returns `InvalidArgument` for malformed `--var` values and `Config` for
/// unusable settings.
pub fn run_config(args: &RunArgs) -> CliResult<RunConfig> {
    let mut browser = BrowserConfig::default().with_headless(!args.headed);
    if args.no_sandbox {
        browser = browser.with_no_sandbox();
    }
    if let Some(path) = &args.chromium_path {
        browser = browser.with_chromium_path(path.clone());
    }

    let mut config = RunConfig::new()
        .with_base_url(args.base_url.trim_end_matches('/'))
        .with_timeout(args.timeout_ms)
        .with_poll_interval(args.poll_ms)
        .with_wait_until(args.wait_until.into())
        .with_browser(browser);
    for raw in &args.vars {
        let (key, value) =
            parse_var(raw).map_err(|e| CliError::invalid_argument(e.to_string()))?;
        config = config.with_var(key, value);
    }
    config
        .validate()
        .map_err(|e| CliError::config(e.to_string()))?;
    Ok(config)
}

/// Load a scenario file, or the built-in portal scenario.
///
/// # Errors
///
/// Returns the read, parse or validation error.
pub fn load_scenario(path: Option<&Path>) -> CliResult<Scenario> {
    let scenario = match path {
        Some(path) => Scenario::load(path)?,
        None => admin_dashboard_scenario()?,
    };
    Ok(scenario)
}

#[cfg(feature = "browser")]
async fn run_in_browser(config: RunConfig, scenario: &Scenario) -> CliResult<RunReport> {
    let browser = dashprobe::Browser::launch(config.browser.clone()).await?;
    let outcome = match browser.new_page().await {
        Ok(page) => ScenarioRunner::new(page, config).run(scenario).await,
        Err(e) => Err(e),
    };
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "browser did not shut down cleanly");
    }
    Ok(outcome?)
}

#[cfg(not(feature = "browser"))]
async fn run_in_browser(config: RunConfig, _scenario: &Scenario) -> CliResult<RunReport> {
    let _browser = dashprobe::Browser::launch(config.browser).await?;
    Err(CliError::config("this build cannot drive a browser; use --dry-run"))
}

//! Output formatting and progress reporting

use console::{style, Style, Term};
use dashprobe::{RunReport, StepFailure, StepReport, StepStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for scenario runs
///
/// Everything goes to stderr so stdout stays free for `show` output.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner while a scenario runs
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Remove the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(&self.prefix("✓", "PASS", Style::new().green().bold()), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        self.line(&self.prefix("✗", "FAIL", Style::new().red().bold()), message);
    }

    /// Print a skipped step
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(&self.prefix("-", "SKIP", Style::new().yellow()), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(&self.prefix("⚠", "WARN", Style::new().yellow().bold()), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(&self.prefix("ℹ", "INFO", Style::new().blue().bold()), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one step outcome
    pub fn step(&self, step: &StepReport) {
        let label = match &step.precondition {
            Some(name) => format!("[{name}] {}", step.description),
            None => step.description.clone(),
        };
        let line = format!("{:>2}. {label} ({} ms)", step.index + 1, step.elapsed_ms);
        match step.status {
            StepStatus::Passed => self.success(&line),
            StepStatus::Failed => self.failure(&line),
            StepStatus::Skipped => self.skipped(&line),
        }
    }

    /// Print what went wrong in the failing step
    pub fn failure_details(&self, failure: &StepFailure) {
        let _ = self.term.write_line(&format!("    step:     {}", failure.step));
        let kind = match failure.inner_kind {
            Some(inner) => format!("{} ({inner})", failure.kind),
            None => failure.kind.to_string(),
        };
        let _ = self.term.write_line(&format!("    error:    {kind}"));
        let _ = self.term.write_line(&format!("    message:  {}", failure.message));
        if let Some(observed) = &failure.last_observed {
            let _ = self.term.write_line(&format!("    observed: {observed}"));
        }
    }

    /// Print the run summary
    pub fn summary(&self, report: &RunReport) {
        let failed = report.count(StepStatus::Failed);
        if self.quiet && failed == 0 {
            return;
        }

        let passed = report.count(StepStatus::Passed);
        let skipped = report.count(StepStatus::Skipped);
        let secs = Duration::from_millis(report.duration_ms).as_secs_f64();
        let status = if report.passed() { "PASSED" } else { "FAILED" };

        let _ = self.term.write_line("");
        let line = format!(
            "{status} {} in {secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)",
            report.scenario
        );
        if self.use_color {
            let style = if report.passed() {
                Style::new().green().bold()
            } else {
                Style::new().red().bold()
            };
            let _ = self.term.write_line(&style.apply_to(line).to_string());
        } else {
            let _ = self.term.write_line(&line);
        }
    }

    fn prefix(&self, symbol: &str, plain: &str, style: Style) -> String {
        if self.use_color {
            style.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        }
    }

    fn line(&self, prefix: &str, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prefix_without_color() {
        let reporter = ProgressReporter::new(false, false);
        assert_eq!(reporter.prefix("✓", "PASS", Style::new()), "PASS");
    }

    #[test]
    fn test_quiet_never_starts_spinner() {
        let mut reporter = ProgressReporter::new(false, true);
        reporter.start_spinner("running");
        assert!(reporter.spinner.is_none());
        reporter.finish();
    }

    #[test]
    fn test_report_printing_does_not_panic() {
        let reporter = ProgressReporter::new(false, false);
        let mut report = RunReport::begin("portal");
        report.steps.push(StepReport {
            index: 0,
            precondition: Some("portal-reachable".to_string()),
            description: "navigate to http://localhost:5173/login".to_string(),
            status: StepStatus::Passed,
            elapsed_ms: 12,
        });
        reporter.step(&report.steps[0]);
        reporter.summary(&report);
    }
}

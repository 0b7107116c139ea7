//! Scenario runner.
//!
//! [`ScenarioRunner`] owns one page and executes steps strictly in order,
//! tracking a small state machine:
//!
//! ```text
//! Idle ──navigate──▶ Navigating ──loaded──▶ Ready ──expect──▶ Asserting
//!   │                    │                  │  ▲                 │
//!   │                    ▼                  │  └──────pass───────┤
//!   └──────────────▶  Failed ◀──────────────┘                    │
//!                        ▲                                       │
//!                        └──────────────timeout──────────────────┘
//! Ready / Asserting ──sequence exhausted──▶ Completed
//! ```
//!
//! Every suspension is a bounded wait. The first failing step stops the run
//! and every later step is reported as skipped.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::Instrument;

use crate::config::RunConfig;
use crate::driver::{resolve, ElementSnapshot, PageDriver, Resolved};
use crate::locator::Locator;
use crate::report::{RunReport, StepFailure, StepReport, StepStatus};
use crate::result::{ProbeError, ProbeResult};
use crate::scenario::{Scenario, Step};
use crate::wait::{poll_until, Check, LoadState, WaitOptions, WaitOutcome};

/// Runner lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    /// Nothing loaded yet
    Idle,
    /// Waiting for a document to load
    Navigating,
    /// A document is loaded and interactions are allowed
    Ready,
    /// Polling an expectation
    Asserting,
    /// A step failed; terminal
    Failed,
    /// Every step passed; terminal
    Completed,
}

impl RunnerState {
    /// Whether moving to `next` is allowed
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Ready, Self::Navigating)
                | (Self::Navigating | Self::Asserting, Self::Ready)
                | (Self::Ready, Self::Asserting)
                | (
                    Self::Idle | Self::Navigating | Self::Ready | Self::Asserting,
                    Self::Failed
                )
                | (Self::Ready | Self::Asserting, Self::Completed)
        )
    }

    /// Whether the run is over
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }
}

impl std::fmt::Display for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// What an interaction needs from its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Fill,
    Click,
}

impl Action {
    const fn accepts(self, element: &ElementSnapshot) -> bool {
        match self {
            Self::Fill => element.is_fillable(),
            Self::Click => element.is_clickable(),
        }
    }
}

/// Executes scenarios against one exclusively owned page
#[derive(Debug)]
pub struct ScenarioRunner<D: PageDriver> {
    page: D,
    config: RunConfig,
    state: RunnerState,
}

impl<D: PageDriver> ScenarioRunner<D> {
    /// Create a runner in the `Idle` state
    #[must_use]
    pub const fn new(page: D, config: RunConfig) -> Self {
        Self {
            page,
            config,
            state: RunnerState::Idle,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RunnerState {
        self.state
    }

    /// The page being driven
    #[must_use]
    pub const fn page(&self) -> &D {
        &self.page
    }

    /// Release the page
    pub fn into_page(self) -> D {
        self.page
    }

    /// Run every precondition step then every scenario step.
    ///
    /// Step failures end up in the report; `Err` means the run could not
    /// start (invalid scenario or a runner that was already used).
    ///
    /// # Errors
    ///
    /// Returns `Scenario` for invalid scenarios and `InvalidState` if this
    /// runner has already run.
    pub async fn run(&mut self, scenario: &Scenario) -> ProbeResult<RunReport> {
        if self.state != RunnerState::Idle {
            return Err(ProbeError::invalid_state(format!(
                "runner already used (state {})",
                self.state
            )));
        }
        let scenario = scenario.clone().with_vars(&self.config.vars);
        scenario.validate()?;
        let scenario = scenario.resolve(&self.config.base_url)?;

        let started = Instant::now();
        let mut report = RunReport::begin(&scenario.name);
        tracing::info!(scenario = %scenario.name, run_id = %report.run_id, "starting run");

        for precondition in scenario.preconditions.iter().filter(|p| p.is_assumed()) {
            tracing::info!(
                precondition = %precondition.name,
                "assuming {}",
                precondition.description
            );
        }

        let planned: Vec<(Option<&str>, &Step)> = scenario
            .preconditions
            .iter()
            .flat_map(|p| p.steps.iter().map(move |s| (Some(p.name.as_str()), s)))
            .chain(scenario.steps.iter().map(|s| (None, s)))
            .collect();

        for (index, (precondition, step)) in planned.into_iter().enumerate() {
            let description = step.to_string();
            if report.failure.is_some() {
                report.steps.push(StepReport {
                    index,
                    precondition: precondition.map(str::to_string),
                    description,
                    status: StepStatus::Skipped,
                    elapsed_ms: 0,
                });
                continue;
            }

            let span = tracing::info_span!("step", index, action = step.action());
            let step_started = Instant::now();
            let result = self.execute_step(step).instrument(span).await;
            let elapsed_ms = millis(step_started);

            let status = match result {
                Ok(()) => {
                    tracing::debug!(index, elapsed_ms, "step passed");
                    StepStatus::Passed
                }
                Err(error) => {
                    let failure = match precondition {
                        Some(name) => {
                            StepFailure::in_precondition(index, description.clone(), name, &error)
                        }
                        None => StepFailure::new(index, description.clone(), &error),
                    };
                    tracing::error!(
                        index,
                        step = %description,
                        kind = %failure.kind,
                        %error,
                        "step failed"
                    );
                    report.failure = Some(failure);
                    StepStatus::Failed
                }
            };
            report.steps.push(StepReport {
                index,
                precondition: precondition.map(str::to_string),
                description,
                status,
                elapsed_ms,
            });
        }

        if report.failure.is_none() {
            self.transition(RunnerState::Completed)?;
        }
        report.final_state = self.state;
        report.duration_ms = millis(started);
        tracing::info!(
            scenario = %report.scenario,
            passed = report.passed(),
            duration_ms = report.duration_ms,
            "run finished"
        );
        Ok(report)
    }

    /// Execute one step, updating the state machine.
    ///
    /// # Errors
    ///
    /// Returns the step's failure; the runner is `Failed` afterwards.
    pub async fn execute_step(&mut self, step: &Step) -> ProbeResult<()> {
        let result = match step {
            Step::Navigate { url } => self.navigate(url).await,
            Step::Fill { locator, value } => match self.require_ready(step) {
                Ok(()) => self.fill(locator, value).await,
                Err(e) => Err(e),
            },
            Step::Click { locator } => match self.require_ready(step) {
                Ok(()) => self.click(locator).await,
                Err(e) => Err(e),
            },
            Step::Screenshot { path } => match self.require_ready(step) {
                Ok(()) => self.screenshot(path).await,
                Err(e) => Err(e),
            },
            Step::ExpectVisible { .. } | Step::ExpectUrl { .. } | Step::ExpectValue { .. } => {
                self.expect(step).await
            }
        };
        if result.is_err() {
            self.fail();
        }
        result
    }

    fn transition(&mut self, next: RunnerState) -> ProbeResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ProbeError::invalid_state(format!(
                "cannot move from {} to {next}",
                self.state
            )));
        }
        tracing::trace!(from = %self.state, to = %next, "state transition");
        self.state = next;
        Ok(())
    }

    fn fail(&mut self) {
        if self.state.can_transition_to(RunnerState::Failed) {
            self.state = RunnerState::Failed;
        }
    }

    fn require_ready(&self, step: &Step) -> ProbeResult<()> {
        match self.state {
            RunnerState::Ready => Ok(()),
            RunnerState::Idle => Err(ProbeError::invalid_state(format!(
                "'{}' issued before the first navigate",
                step.action()
            ))),
            other => Err(ProbeError::invalid_state(format!(
                "'{}' not allowed in state {other}",
                step.action()
            ))),
        }
    }

    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.transition(RunnerState::Navigating)?;
        let options = self.config.wait_options();
        tracing::debug!(url, wait_until = %options.wait_until, "navigating");
        self.page
            .goto(url, options.wait_until, options.timeout())
            .await?;
        self.transition(RunnerState::Ready)
    }

    async fn expect(&mut self, step: &Step) -> ProbeResult<()> {
        let Some(expectation) = step.expectation() else {
            return Err(ProbeError::invalid_state(format!(
                "'{}' is not an expectation",
                step.action()
            )));
        };
        self.require_ready(step)?;
        self.transition(RunnerState::Asserting)?;
        let verified = expectation
            .verify(&self.page, &self.config.wait_options())
            .await?;
        tracing::debug!(observed = %verified.observed, attempts = verified.attempts, "expectation passed");
        self.transition(RunnerState::Ready)
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> ProbeResult<()> {
        let index = self.actionable(locator, Action::Fill).await?;
        tracing::debug!(%locator, index, "filling");
        self.page.fill(locator, index, value).await
    }

    async fn click(&mut self, locator: &Locator) -> ProbeResult<()> {
        let index = self.actionable(locator, Action::Click).await?;
        tracing::debug!(%locator, index, "clicking");
        self.page.click(locator, index).await?;
        self.settle().await
    }

    async fn screenshot(&mut self, path: &Path) -> ProbeResult<()> {
        let png = self.page.screenshot().await?;
        write_file(path, &png).await?;
        tracing::info!(path = %path.display(), bytes = png.len(), "screenshot saved");
        Ok(())
    }

    /// Wait until the locator designates one element `action` can use.
    async fn actionable(&self, locator: &Locator, action: Action) -> ProbeResult<usize> {
        let options = self.config.wait_options();
        let page = &self.page;
        let outcome = poll_until(&options, move || async move {
            let snapshots = page.query(locator).await?;
            Ok(match resolve(locator, snapshots) {
                Resolved::One { index, element } if action.accepts(&element) => Check::Ready(index),
                Resolved::One { element, .. } => Check::Pending(element.describe()),
                Resolved::Missing { matches } => {
                    Check::Pending(format!("{matches} match(es), none selected"))
                }
                Resolved::Ambiguous { matches } => {
                    return Err(ProbeError::AmbiguousLocator {
                        locator: locator.to_string(),
                        count: matches,
                    })
                }
            })
        })
        .await?;

        match outcome {
            WaitOutcome::Satisfied { value, .. } => Ok(value),
            WaitOutcome::TimedOut { last_observed, .. } => {
                Err(self.not_actionable(locator, action, last_observed, &options).await)
            }
        }
    }

    /// Classify an interaction timeout from one final observation
    async fn not_actionable(
        &self,
        locator: &Locator,
        action: Action,
        last_observed: String,
        options: &WaitOptions,
    ) -> ProbeError {
        let snapshots = match self.page.query(locator).await {
            Ok(snapshots) => snapshots,
            Err(e) => return e,
        };
        match (resolve(locator, snapshots), action) {
            (Resolved::Missing { .. }, _) => ProbeError::ElementNotFound {
                locator: locator.to_string(),
            },
            (Resolved::Ambiguous { matches }, _) => ProbeError::AmbiguousLocator {
                locator: locator.to_string(),
                count: matches,
            },
            (Resolved::One { element, .. }, Action::Fill) => ProbeError::Interaction {
                locator: locator.to_string(),
                message: format!("element is not editable ({})", element.describe()),
            },
            (Resolved::One { .. }, Action::Click) => ProbeError::Timeout {
                what: format!("{locator} to become clickable (last: {last_observed})"),
                ms: options.timeout_ms,
            },
        }
    }

    /// Wait for the document to report `complete` after an interaction.
    /// A page that never settles is logged, not failed.
    async fn settle(&self) -> ProbeResult<()> {
        let options = self.config.wait_options();
        let page = &self.page;
        let outcome = poll_until(&options, move || async move {
            let state = page.ready_state().await?;
            Ok(if LoadState::Load.is_reached_by(&state) {
                Check::Ready(())
            } else {
                Check::Pending(state)
            })
        })
        .await?;
        if let WaitOutcome::TimedOut { last_observed, .. } = outcome {
            tracing::warn!(
                ready_state = %last_observed,
                timeout_ms = options.timeout_ms,
                "page did not settle after click"
            );
        }
        Ok(())
    }
}

/// Write `bytes` to `path`, creating missing parent directories
pub(crate) async fn write_file(path: &Path, bytes: &[u8]) -> ProbeResult<()> {
    let io_err = |source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, bytes).await.map_err(io_err)
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

//! Run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::result::{ErrorKind, ProbeError, ProbeResult};
use crate::runner::RunnerState;

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Ran and succeeded
    Passed,
    /// Ran and failed
    Failed,
    /// Not run because an earlier step failed
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Record of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Position in run order, precondition steps included
    pub index: usize,
    /// Precondition the step belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<String>,
    /// Human-readable step
    pub description: String,
    /// Outcome
    pub status: StepStatus,
    /// Time spent on the step
    pub elapsed_ms: u64,
}

/// Details of the step that stopped the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Index of the failing step
    pub index: usize,
    /// Human-readable step
    pub step: String,
    /// Error classification
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
    /// Last UI state seen by a polling assertion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observed: Option<String>,
    /// Classification of the underlying error when `kind` is a precondition failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_kind: Option<ErrorKind>,
}

impl StepFailure {
    /// Describe a failed step
    #[must_use]
    pub fn new(index: usize, step: impl Into<String>, error: &ProbeError) -> Self {
        Self {
            index,
            step: step.into(),
            kind: error.kind(),
            message: error.to_string(),
            last_observed: error.last_observed().map(str::to_string),
            inner_kind: None,
        }
    }

    /// Describe a step that failed while establishing precondition `name`.
    ///
    /// The failure is classified as `PreconditionError`; the error that
    /// caused it keeps its own kind in `inner_kind`.
    #[must_use]
    pub fn in_precondition(
        index: usize,
        step: impl Into<String>,
        name: &str,
        error: &ProbeError,
    ) -> Self {
        let wrapped = ProbeError::Precondition {
            name: name.to_string(),
            message: error.to_string(),
        };
        Self {
            last_observed: error.last_observed().map(str::to_string),
            inner_kind: Some(error.kind()),
            ..Self::new(index, step, &wrapped)
        }
    }
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} ({}) failed with {}", self.index + 1, self.step, self.kind)?;
        if let Some(inner) = self.inner_kind {
            write!(f, " ({inner})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Result of running one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Scenario name
    pub scenario: String,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Total duration
    pub duration_ms: u64,
    /// Runner state at the end
    pub final_state: RunnerState,
    /// Every step in run order
    pub steps: Vec<StepReport>,
    /// First failure, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl RunReport {
    /// Start an empty report for `scenario`
    #[must_use]
    pub fn begin(scenario: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.into(),
            started_at: Utc::now(),
            duration_ms: 0,
            final_state: RunnerState::Idle,
            steps: Vec::new(),
            failure: None,
        }
    }

    /// Whether every step passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failure.is_none() && self.final_state == RunnerState::Completed
    }

    /// Count steps with a given status
    #[must_use]
    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns `Json` if serialization fails
    pub fn to_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be written
    pub async fn write_json(&self, path: &Path) -> ProbeResult<()> {
        let json = self.to_json()?;
        crate::runner::write_file(path, json.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(statuses: &[StepStatus]) -> RunReport {
        let mut report = RunReport::begin("portal");
        for (index, status) in statuses.iter().enumerate() {
            report.steps.push(StepReport {
                index,
                precondition: None,
                description: format!("step {index}"),
                status: *status,
                elapsed_ms: 1,
            });
        }
        report
    }

    #[test]
    fn test_passed_requires_completed_state() {
        let mut report = report_with(&[StepStatus::Passed]);
        assert!(!report.passed());
        report.final_state = RunnerState::Completed;
        assert!(report.passed());
    }

    #[test]
    fn test_counts() {
        let report = report_with(&[StepStatus::Passed, StepStatus::Failed, StepStatus::Skipped, StepStatus::Skipped]);
        assert_eq!(report.count(StepStatus::Passed), 1);
        assert_eq!(report.count(StepStatus::Skipped), 2);
    }

    #[test]
    fn test_failure_from_assertion_keeps_last_observed() {
        let err = ProbeError::Assertion {
            expectation: "text \"N/A\" not to be visible".to_string(),
            last_observed: "1 of 1 match(es) visible".to_string(),
            ms: 5000,
        };
        let failure = StepFailure::new(17, "expect text \"N/A\" not to be visible", &err);
        assert_eq!(failure.kind, ErrorKind::AssertionError);
        assert_eq!(failure.last_observed.as_deref(), Some("1 of 1 match(es) visible"));
        assert!(failure.to_string().starts_with("step 18 "));
    }

    #[test]
    fn test_precondition_failure_keeps_inner_kind() {
        let err = ProbeError::Navigation {
            url: "http://127.0.0.1:9/login".to_string(),
            message: "connection refused".to_string(),
        };
        let failure = StepFailure::in_precondition(1, "navigate to /login", "portal-reachable", &err);
        assert_eq!(failure.kind, ErrorKind::PreconditionError);
        assert_eq!(failure.inner_kind, Some(ErrorKind::NavigationError));
        assert!(failure.message.contains("portal-reachable"));
        assert!(failure
            .to_string()
            .contains("failed with PreconditionError (NavigationError)"));

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["inner_kind"], "NavigationError");
        let back: StepFailure = serde_json::from_value(json).unwrap();
        assert_eq!(back, failure);
    }

    #[test]
    fn test_json_shape() {
        let mut report = report_with(&[StepStatus::Failed]);
        report.final_state = RunnerState::Failed;
        report.failure = Some(StepFailure::new(
            0,
            "navigate to http://localhost:5173/login",
            &ProbeError::Navigation {
                url: "http://localhost:5173/login".to_string(),
                message: "refused".to_string(),
            },
        ));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["final_state"], "failed");
        assert_eq!(value["steps"][0]["status"], "failed");
        assert_eq!(value["failure"]["kind"], "NavigationError");
        assert!(value["failure"].get("last_observed").is_none());
        assert!(value["failure"].get("inner_kind").is_none());
        assert!(value["run_id"].is_string());
    }

    #[tokio::test]
    async fn test_write_json_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.json");
        report_with(&[]).write_json(&path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"scenario\": \"portal\""));
    }
}

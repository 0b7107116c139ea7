//! End-to-end runs of the built-in portal scenario against the in-memory
//! portal, for the fixed build and each regression it guards against.

use dashprobe::mock::portal::PortalFixture;
use dashprobe::prelude::*;
use dashprobe::{admin_dashboard_scenario, portal::SCREENSHOT_PATH_VAR};
use std::path::PathBuf;
use tempfile::TempDir;

const BASE: &str = "http://localhost:5173";

struct Run {
    report: RunReport,
    screenshot: PathBuf,
    history: Vec<String>,
    _dir: TempDir,
}

async fn run(fixture: PortalFixture) -> Run {
    let dir = tempfile::tempdir().unwrap();
    let screenshot = dir.path().join("verification/verification.png");
    let config = RunConfig::new()
        .with_base_url(BASE)
        .with_timeout(200)
        .with_poll_interval(5)
        .with_var(SCREENSHOT_PATH_VAR, screenshot.to_string_lossy());

    let mut runner = ScenarioRunner::new(fixture.build(), config);
    let report = runner.run(&admin_dashboard_scenario().unwrap()).await.unwrap();
    Run {
        report,
        screenshot,
        history: runner.into_page().history(),
        _dir: dir,
    }
}

fn failing_step(report: &RunReport) -> &StepFailure {
    report.failure.as_ref().unwrap()
}

#[tokio::test]
async fn test_fixed_portal_passes_every_step() {
    let run = run(PortalFixture::fixed(BASE)).await;
    assert!(run.report.passed(), "{:?}", run.report.failure);
    assert_eq!(run.report.final_state, RunnerState::Completed);
    assert_eq!(run.report.count(StepStatus::Passed), run.report.steps.len());
    assert_eq!(run.report.steps.len(), 23);
    let png = std::fs::read(&run.screenshot).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn test_pages_visited_in_order() {
    let run = run(PortalFixture::fixed(BASE)).await;
    assert_eq!(
        run.history,
        [
            format!("{BASE}/login"),
            format!("{BASE}/login"),
            format!("{BASE}/admin-dashboard"),
            format!("{BASE}/login"),
            format!("{BASE}/login"),
            format!("{BASE}/customer-dashboard"),
        ]
    );
}

#[tokio::test]
async fn test_two_fresh_runs_agree() {
    let first = run(PortalFixture::fixed(BASE)).await;
    let second = run(PortalFixture::fixed(BASE)).await;
    let statuses = |r: &Run| r.report.steps.iter().map(|s| s.status).collect::<Vec<_>>();
    assert_eq!(statuses(&first), statuses(&second));
    assert_eq!(first.report.final_state, second.report.final_state);
    assert_ne!(first.report.run_id, second.report.run_id);
}

#[tokio::test]
async fn test_near_expire_status_regression() {
    let run = run(PortalFixture::fixed(BASE).with_near_expire_status()).await;
    let failure = failing_step(&run.report);
    assert_eq!(failure.kind, ErrorKind::AssertionError);
    assert!(failure.step.contains("نزدیک انقضا"));
    assert!(failure.last_observed.as_deref().unwrap().contains("visible"));
    assert!(!run.screenshot.exists());
}

#[tokio::test]
async fn test_near_due_card_regression() {
    let run = run(PortalFixture::fixed(BASE).with_near_due_card()).await;
    let failure = failing_step(&run.report);
    assert_eq!(failure.kind, ErrorKind::AssertionError);
    assert!(failure.step.contains("اقساط نزدیک سررسید"));
}

#[tokio::test]
async fn test_end_date_not_filled_regression() {
    let run = run(PortalFixture::fixed(BASE).without_end_date_autofill()).await;
    let failure = failing_step(&run.report);
    assert_eq!(failure.kind, ErrorKind::AssertionError);
    assert!(failure.step.starts_with("expect placeholder"));
    assert_eq!(failure.last_observed.as_deref(), Some("value \"\""));
    let skipped = run.report.count(StepStatus::Skipped);
    assert_eq!(skipped, run.report.steps.len() - failure.index - 1);
}

#[tokio::test]
async fn test_slow_end_date_autofill_still_passes() {
    let run = run(PortalFixture::fixed(BASE).with_autofill_delay(6)).await;
    assert!(run.report.passed(), "{:?}", run.report.failure);
}

#[tokio::test]
async fn test_na_pay_id_regression() {
    let run = run(PortalFixture::fixed(BASE).with_na_pay_id()).await;
    let failure = failing_step(&run.report);
    assert_eq!(failure.kind, ErrorKind::AssertionError);
    assert!(failure.step.contains("N/A"));
    assert_eq!(run.report.steps.last().unwrap().status, StepStatus::Skipped);
}

#[tokio::test]
async fn test_missing_customer_account() {
    let run = run(PortalFixture::fixed(BASE).without_account("1234567890")).await;
    let failure = failing_step(&run.report);
    assert_eq!(failure.kind, ErrorKind::AssertionError);
    assert!(failure.step.contains("/customer-dashboard"));
    assert!(failure.last_observed.as_deref().unwrap().contains("/login"));
}

#[tokio::test]
async fn test_unreachable_portal_fails_precondition() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::new()
        .with_base_url("http://127.0.0.1:9")
        .with_timeout(100)
        .with_poll_interval(5)
        .with_var(SCREENSHOT_PATH_VAR, dir.path().join("s.png").to_string_lossy());
    let mut runner = ScenarioRunner::new(PortalFixture::fixed(BASE).build(), config);
    let report = runner.run(&admin_dashboard_scenario().unwrap()).await.unwrap();
    let failure = report.failure.unwrap();
    assert_eq!(failure.kind, ErrorKind::PreconditionError);
    assert_eq!(failure.inner_kind, Some(ErrorKind::AssertionError));
    assert!(failure.message.contains("portal-reachable"));
    assert_eq!(failure.index, 1);
}

#[tokio::test]
async fn test_refused_login_page_reports_navigation_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::new()
        .with_base_url(BASE)
        .with_timeout(100)
        .with_poll_interval(5)
        .with_var(SCREENSHOT_PATH_VAR, dir.path().join("s.png").to_string_lossy());
    let mut page = PortalFixture::fixed(BASE).build();
    let _ = page.dom_mut().unreachable(format!("{BASE}/login"));
    let mut runner = ScenarioRunner::new(page, config);
    let report = runner.run(&admin_dashboard_scenario().unwrap()).await.unwrap();
    let failure = report.failure.unwrap();
    assert_eq!(failure.index, 0);
    assert_eq!(failure.kind, ErrorKind::PreconditionError);
    assert_eq!(failure.inner_kind, Some(ErrorKind::NavigationError));
    assert!(failure.to_string().contains("(NavigationError)"));
}

//! Example: Portal dry run
//!
//! Demonstrates: running the built-in portal scenario against the in-memory
//! portal, once as fixed and once with a regression switched on.
//!
//! Run with: `cargo run --example portal_dry_run`

use dashprobe::admin_dashboard_scenario;
use dashprobe::mock::portal::PortalFixture;
use dashprobe::portal::SCREENSHOT_PATH_VAR;
use dashprobe::prelude::*;

const BASE: &str = "http://localhost:5173";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ProbeResult<()> {
    println!("=== Portal Dry Run ===\n");

    let scenario = admin_dashboard_scenario()?;
    println!("{}", scenario.resolve(BASE)?.describe());

    let screenshot = std::env::temp_dir().join("dashprobe-example/verification.png");
    let config = RunConfig::new()
        .with_base_url(BASE)
        .with_timeout(500)
        .with_poll_interval(10)
        .with_var(SCREENSHOT_PATH_VAR, screenshot.to_string_lossy());

    println!("1. Fixed portal...");
    let fixed = PortalFixture::fixed(BASE).build();
    let report = ScenarioRunner::new(fixed, config.clone()).run(&scenario).await?;
    println!(
        "   {} ({} steps passed, screenshot at {})",
        if report.passed() { "passed" } else { "failed" },
        report.count(StepStatus::Passed),
        screenshot.display()
    );

    println!("\n2. Portal that still renders \"N/A\"...");
    let broken = PortalFixture::fixed(BASE).with_na_pay_id().build();
    let report = ScenarioRunner::new(broken, config).run(&scenario).await?;
    if let Some(failure) = &report.failure {
        println!("   {failure}");
        if let Some(observed) = &failure.last_observed {
            println!("   last observed: {observed}");
        }
    }
    println!("   {} steps skipped", report.count(StepStatus::Skipped));

    Ok(())
}

//! Dashprobe: scenario runner for browser-driven dashboard checks
//!
//! Dashprobe drives one browser tab through an ordered list of steps
//! (navigate, fill, click, expect, screenshot) and stops at the first step
//! that fails. Every wait is bounded: navigations wait for the load event,
//! interactions wait for an actionable element, and expectations poll until
//! they hold or the timeout elapses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    DASHPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Scenario   │    │ PageDriver │──► Chromium │
//! │   │ (YAML)     │───►│ Runner     │───►│            │    (CDP)    │
//! │   │            │    │            │    │            │──► MockPage │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use dashprobe::mock::portal::PortalFixture;
//! use dashprobe::{admin_dashboard_scenario, RunConfig, ScenarioRunner};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dir = tempfile::tempdir().unwrap();
//! let shot = dir.path().join("shot.png");
//! let config = RunConfig::new()
//!     .with_base_url("http://localhost:5173")
//!     .with_var("SCREENSHOT_PATH", shot.to_string_lossy());
//! let page = PortalFixture::fixed("http://localhost:5173").build();
//!
//! let mut runner = ScenarioRunner::new(page, config);
//! let report = runner.run(&admin_dashboard_scenario().unwrap()).await.unwrap();
//! assert!(report.passed());
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod browser;
mod config;
mod driver;
#[allow(clippy::missing_errors_doc)]
mod expect;
mod locator;
mod report;
mod result;
#[allow(clippy::missing_errors_doc)]
mod runner;
mod scenario;

/// Bounded waiting primitives
pub mod wait;

/// In-memory page driver and portal model
///
/// Used by tests and by dry runs; no browser required.
#[allow(clippy::missing_panics_doc, clippy::must_use_candidate)]
pub mod mock;

/// Built-in portal verification scenario
pub mod portal;

#[cfg(feature = "browser")]
pub use browser::CdpPage;
pub use browser::{Browser, BrowserConfig};
pub use config::{parse_var, RunConfig, DEFAULT_BASE_URL};
pub use driver::{resolve, ElementSnapshot, PageDriver, Resolved};
pub use expect::{CompiledPattern, Expectation, ValuePattern, Verified};
pub use locator::{normalize_whitespace, text_matches, Locator, Selector};
pub use portal::{admin_dashboard_scenario, DEFAULT_SCREENSHOT_PATH};
pub use report::{RunReport, StepFailure, StepReport, StepStatus};
pub use result::{ErrorKind, ProbeError, ProbeResult};
pub use runner::{RunnerState, ScenarioRunner};
pub use scenario::{expand_vars, join_url, Precondition, Scenario, Step};
pub use wait::{LoadState, WaitOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::expect::*;
    pub use super::locator::*;
    pub use super::report::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::scenario::*;
    pub use super::wait::*;
}

//! Run configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::browser::BrowserConfig;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{LoadState, WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Root origin of the application when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";

/// Settings shared by every step of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Origin relative URLs are joined to
    pub base_url: String,
    /// Uniform bound for every wait, in milliseconds
    pub timeout_ms: u64,
    /// Interval between polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Lifecycle signal a navigation waits for
    #[serde(default)]
    pub wait_until: LoadState,
    /// Variable overrides applied on top of the scenario's `vars`
    pub vars: BTreeMap<String, String>,
    /// Browser launch settings
    pub browser: BrowserConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            wait_until: LoadState::Load,
            vars: BTreeMap::new(),
            browser: BrowserConfig::default(),
        }
    }
}

impl RunConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the wait timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the lifecycle signal navigations wait for
    #[must_use]
    pub const fn with_wait_until(mut self, state: LoadState) -> Self {
        self.wait_until = state;
        self
    }

    /// Override one scenario variable
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.vars.insert(key.into(), value.into());
        self
    }

    /// Set browser settings
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Wait options derived from this configuration
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
            .with_wait_until(self.wait_until)
    }

    /// Reject unusable settings
    ///
    /// # Errors
    ///
    /// Returns `Scenario` describing the first bad setting
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::scenario(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ProbeError::scenario("timeout must be positive"));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.timeout_ms {
            return Err(ProbeError::scenario(format!(
                "poll interval must be between 1 and {} ms",
                self.timeout_ms
            )));
        }
        Ok(())
    }
}

/// Parse a `KEY=VALUE` variable override
///
/// # Errors
///
/// Returns `Scenario` if there is no `=` or the key is empty
pub fn parse_var(input: &str) -> ProbeResult<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ProbeError::scenario(format!(
            "expected KEY=VALUE, got '{input}'"
        ))),
    }
}

//! Wait mechanisms.
//!
//! Every suspension in a scenario is a bounded wait: either a poll loop that
//! re-checks a condition at a fixed interval, or a single browser event
//! raced against a timeout. Fixed sleeps are never used to synchronise with
//! the page.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::result::ProbeResult;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Document lifecycle signals a navigation can wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Wait for the `load` event to fire
    #[default]
    Load,
    /// Wait for `DOMContentLoaded` event
    DomContentLoaded,
}

impl LoadState {
    /// Get the JavaScript event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
        }
    }

    /// Whether `document.readyState` satisfies this load state
    #[must_use]
    pub fn is_reached_by(&self, ready_state: &str) -> bool {
        match self {
            Self::Load => ready_state == "complete",
            Self::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// State navigations wait for
    pub wait_until: LoadState,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            wait_until: LoadState::Load,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set load state to wait for
    #[must_use]
    pub const fn with_wait_until(mut self, state: LoadState) -> Self {
        self.wait_until = state;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// One observation of a polled condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Condition holds
    Ready(T),
    /// Condition does not hold yet; carries what was observed
    Pending(String),
}

/// How a bounded poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The condition held on some observation
    Satisfied {
        /// Value produced by the satisfying observation
        value: T,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of observations made
        attempts: u32,
    },
    /// The timeout elapsed first
    TimedOut {
        /// Last thing observed before giving up
        last_observed: String,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of observations made
        attempts: u32,
    },
}

impl<T> WaitOutcome<T> {
    /// Whether the condition held
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }
}

/// Poll `probe` until it reports [`Check::Ready`] or the timeout elapses.
///
/// The first observation happens immediately, so a zero timeout still checks
/// once. Errors from `probe` abort the wait and propagate unchanged.
pub async fn poll_until<T, F, Fut>(options: &WaitOptions, mut probe: F) -> ProbeResult<WaitOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Check<T>>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let interval = options.poll_interval();
    let mut attempts = 0_u32;

    loop {
        attempts += 1;
        match probe().await? {
            Check::Ready(value) => {
                return Ok(WaitOutcome::Satisfied {
                    value,
                    elapsed: start.elapsed(),
                    attempts,
                });
            }
            Check::Pending(last_observed) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return Ok(WaitOutcome::TimedOut {
                        last_observed,
                        elapsed,
                        attempts,
                    });
                }
                tracing::trace!(attempt = attempts, observed = %last_observed, "condition pending");
                tokio::time::sleep(interval.min(timeout - elapsed)).await;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

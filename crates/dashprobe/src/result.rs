//! Result and error types for dashprobe.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for dashprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while running a scenario.
///
/// Every variant is fatal to the scenario that produced it.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation target unreachable or rejected
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Locator matched nothing
    #[error("No element matches {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// Locator matched more than one element in strict mode
    #[error("{locator} matched {count} elements, expected exactly one")]
    AmbiguousLocator {
        /// Locator description
        locator: String,
        /// Number of matches
        count: usize,
    },

    /// Element found but cannot be interacted with
    #[error("Cannot interact with {locator}: {message}")]
    Interaction {
        /// Locator description
        locator: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Expectation did not hold before the timeout
    #[error("Expected {expectation} within {ms}ms, last observed: {last_observed}")]
    Assertion {
        /// Expectation description
        expectation: String,
        /// Last observed state
        last_observed: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Screenshot capture failed inside the browser
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// File could not be written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Scenario definition is invalid
    #[error("Invalid scenario: {message}")]
    Scenario {
        /// Error message
        message: String,
    },

    /// A declared fixture precondition did not hold
    #[error("Precondition '{name}' failed: {message}")]
    Precondition {
        /// Precondition name
        name: String,
        /// Error message from the failing step
        message: String,
    },

    /// Step issued in a runner state that does not allow it
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable classification of [`ProbeError`] used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Browser could not start
    BrowserLaunchError,
    /// Navigation failed
    NavigationError,
    /// Nothing matched
    ElementNotFoundError,
    /// More than one match
    AmbiguousLocatorError,
    /// Element disabled, read-only or hidden
    InteractionError,
    /// Bounded wait expired
    TimeoutError,
    /// Expectation failed
    AssertionError,
    /// Filesystem or capture failure
    IoError,
    /// Bad scenario definition
    ScenarioError,
    /// Fixture precondition failed
    PreconditionError,
    /// Runner state machine violation
    InvalidState,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl ProbeError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BrowserLaunch { .. } => ErrorKind::BrowserLaunchError,
            Self::Navigation { .. } => ErrorKind::NavigationError,
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFoundError,
            Self::AmbiguousLocator { .. } => ErrorKind::AmbiguousLocatorError,
            Self::Interaction { .. } => ErrorKind::InteractionError,
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::Assertion { .. } => ErrorKind::AssertionError,
            Self::Screenshot { .. } | Self::Io { .. } => ErrorKind::IoError,
            Self::Scenario { .. } | Self::Yaml(_) | Self::Json(_) => ErrorKind::ScenarioError,
            Self::Precondition { .. } => ErrorKind::PreconditionError,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    /// Last observed UI state, when the error carries one
    #[must_use]
    pub fn last_observed(&self) -> Option<&str> {
        match self {
            Self::Assertion { last_observed, .. } => Some(last_observed),
            _ => None,
        }
    }

    /// Create a scenario error
    #[must_use]
    pub fn scenario(message: impl Into<String>) -> Self {
        Self::Scenario {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

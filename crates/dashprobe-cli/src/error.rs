//! Error types for the CLI

use dashprobe::ProbeError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// The scenario ran and a step failed
    #[error("Scenario '{scenario}' failed: {summary}")]
    ScenarioFailed {
        /// Scenario name
        scenario: String,
        /// One-line description of the failing step
        summary: String,
    },

    /// Library error
    #[error("{0}")]
    Probe(#[from] ProbeError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_scenario_failed_names_scenario() {
        let err = CliError::ScenarioFailed {
            scenario: "admin-dashboard-changes".to_string(),
            summary: "step 9 failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Scenario 'admin-dashboard-changes' failed: step 9 failed"
        );
    }

    #[test]
    fn test_probe_error_from() {
        let err: CliError = ProbeError::scenario("scenario has no steps").into();
        assert!(err.to_string().contains("no steps"));
    }
}

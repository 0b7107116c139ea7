//! Polling expectations over page state.
//!
//! An [`Expectation`] is checked against the live page repeatedly until it
//! holds or the timeout elapses. On timeout it fails with an `Assertion`
//! error carrying the last state it saw.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::driver::{resolve, PageDriver, Resolved};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, Check, WaitOptions, WaitOutcome};

/// String condition for URLs and field values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePattern {
    /// Whole string equality
    Exact(String),
    /// Substring
    Contains(String),
    /// Regular expression search (unanchored unless the pattern anchors)
    Regex(String),
}

impl ValuePattern {
    /// Compile into a matcher, rejecting invalid regular expressions
    pub fn compile(&self) -> ProbeResult<CompiledPattern> {
        Ok(match self {
            Self::Exact(s) => CompiledPattern::Exact(s.clone()),
            Self::Contains(s) => CompiledPattern::Contains(s.clone()),
            Self::Regex(src) => CompiledPattern::Regex(Regex::new(src).map_err(|e| {
                ProbeError::scenario(format!("invalid regex /{src}/: {e}"))
            })?),
        })
    }

    /// Apply a string rewrite to the pattern text
    pub fn map_string<E>(&self, f: impl FnOnce(&str) -> Result<String, E>) -> Result<Self, E> {
        Ok(match self {
            Self::Exact(s) => Self::Exact(f(s)?),
            Self::Contains(s) => Self::Contains(f(s)?),
            Self::Regex(s) => Self::Regex(f(s)?),
        })
    }
}

impl std::fmt::Display for ValuePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "exactly {s:?}"),
            Self::Contains(s) => write!(f, "containing {s:?}"),
            Self::Regex(s) => write!(f, "matching /{s}/"),
        }
    }
}

/// A [`ValuePattern`] ready for repeated matching
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Whole string equality
    Exact(String),
    /// Substring
    Contains(String),
    /// Regular expression search
    Regex(Regex),
}

impl CompiledPattern {
    /// Test a string
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(s) => candidate == s,
            Self::Contains(s) => candidate.contains(s.as_str()),
            Self::Regex(re) => re.is_match(candidate),
        }
    }
}

/// A bounded polling assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Element visibility
    Visible {
        /// Element to check
        locator: Locator,
        /// `true`: exactly one visible match; `false`: no visible match
        visible: bool,
    },
    /// Page URL
    Url {
        /// Condition on the URL
        pattern: ValuePattern,
    },
    /// Form field value
    Value {
        /// Field to check
        locator: Locator,
        /// Condition on the value
        pattern: ValuePattern,
    },
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visible {
                locator,
                visible: true,
            } => write!(f, "{locator} to be visible"),
            Self::Visible {
                locator,
                visible: false,
            } => write!(f, "{locator} not to be visible"),
            Self::Url { pattern } => write!(f, "page URL {pattern}"),
            Self::Value { locator, pattern } => write!(f, "{locator} to have value {pattern}"),
        }
    }
}

/// Successful expectation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// What the passing observation saw
    pub observed: String,
    /// Time until the condition held
    pub elapsed: Duration,
    /// Observations made
    pub attempts: u32,
}

impl Expectation {
    /// Poll the page until this expectation holds.
    ///
    /// Fails with `Assertion` on timeout and with `AmbiguousLocator` as soon
    /// as a strict locator that must designate one element matches several.
    /// A strict "not visible" check tolerates hidden duplicates but fails
    /// the same way once two matches are visible.
    pub async fn verify<D: PageDriver + ?Sized>(
        &self,
        page: &D,
        options: &WaitOptions,
    ) -> ProbeResult<Verified> {
        let outcome = match self {
            Self::Visible { locator, visible } => {
                poll_until(options, || observe_visibility(page, locator, *visible)).await?
            }
            Self::Url { pattern } => {
                let compiled = pattern.compile()?;
                poll_until(options, || observe_url(page, &compiled)).await?
            }
            Self::Value { locator, pattern } => {
                let compiled = pattern.compile()?;
                poll_until(options, || observe_value(page, locator, &compiled)).await?
            }
        };

        match outcome {
            WaitOutcome::Satisfied {
                value,
                elapsed,
                attempts,
            } => {
                tracing::debug!(expectation = %self, attempts, "expectation met");
                Ok(Verified {
                    observed: value,
                    elapsed,
                    attempts,
                })
            }
            WaitOutcome::TimedOut { last_observed, .. } => Err(ProbeError::Assertion {
                expectation: self.to_string(),
                last_observed,
                ms: options.timeout_ms,
            }),
        }
    }
}

async fn observe_visibility<D: PageDriver + ?Sized>(
    page: &D,
    locator: &Locator,
    want_visible: bool,
) -> ProbeResult<Check<String>> {
    let snapshots = page.query(locator).await?;
    let total = snapshots.len();

    if !want_visible && locator.is_strict() {
        let shown: Vec<_> = snapshots.iter().filter(|s| s.visible).collect();
        return match shown.as_slice() {
            [] => Ok(Check::Ready(format!("{total} match(es), none visible"))),
            [only] => Ok(Check::Pending(format!(
                "1 of {total} match(es) visible, first: {}",
                only.describe()
            ))),
            _ => Err(ProbeError::AmbiguousLocator {
                locator: locator.to_string(),
                count: shown.len(),
            }),
        };
    }

    Ok(match resolve(locator, snapshots) {
        Resolved::One { element, .. } if element.visible == want_visible => {
            Check::Ready(element.describe())
        }
        Resolved::One { element, .. } => Check::Pending(element.describe()),
        Resolved::Missing { .. } if !want_visible => {
            Check::Ready(format!("{total} match(es), target absent"))
        }
        Resolved::Missing { .. } => Check::Pending(format!("no element at {locator}")),
        Resolved::Ambiguous { matches } => {
            return Err(ProbeError::AmbiguousLocator {
                locator: locator.to_string(),
                count: matches,
            })
        }
    })
}

async fn observe_url<D: PageDriver + ?Sized>(
    page: &D,
    pattern: &CompiledPattern,
) -> ProbeResult<Check<String>> {
    let url = page.current_url().await?;
    Ok(if pattern.matches(&url) {
        Check::Ready(url)
    } else {
        Check::Pending(format!("url {url:?}"))
    })
}

async fn observe_value<D: PageDriver + ?Sized>(
    page: &D,
    locator: &Locator,
    pattern: &CompiledPattern,
) -> ProbeResult<Check<String>> {
    let snapshots = page.query(locator).await?;
    Ok(match resolve(locator, snapshots) {
        Resolved::One { element, .. } => match element.value {
            Some(value) if pattern.matches(&value) => Check::Ready(value),
            Some(value) => Check::Pending(format!("value {value:?}")),
            None => Check::Pending(format!("{} (not a form field)", element.describe())),
        },
        Resolved::Missing { .. } => Check::Pending(format!("no element at {locator}")),
        Resolved::Ambiguous { matches } => {
            return Err(ProbeError::AmbiguousLocator {
                locator: locator.to_string(),
                count: matches,
            })
        }
    })
}

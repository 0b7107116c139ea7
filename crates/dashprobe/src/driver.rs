//! Page driver seam.
//!
//! The runner talks to a page only through [`PageDriver`]. Drivers report
//! raw observations (every element a locator's selector matches); strictness,
//! actionability and waiting are decided by the runner so that every driver
//! behaves the same way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::locator::Locator;
use crate::result::ProbeResult;
use crate::wait::LoadState;

/// Observable state of one matched element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Rendered with a non-empty box and not hidden by style
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Accepts typed values
    pub editable: bool,
    /// Current value for form fields
    #[serde(default)]
    pub value: Option<String>,
    /// Normalised visible text
    #[serde(default)]
    pub text: String,
}

impl ElementSnapshot {
    /// Whether a click can be dispatched
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.visible && self.enabled
    }

    /// Whether a value can be written
    #[must_use]
    pub const fn is_fillable(&self) -> bool {
        self.visible && self.enabled && self.editable
    }

    /// Short description for failure messages
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = vec![if self.visible { "visible" } else { "hidden" }.to_string()];
        if !self.enabled {
            parts.push("disabled".to_string());
        }
        if let Some(value) = &self.value {
            parts.push(format!("value {value:?}"));
        } else if !self.text.is_empty() {
            parts.push(format!("text {:?}", truncate(&self.text, 60)));
        }
        parts.join(", ")
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    }
}

/// Outcome of applying a locator's strictness rules to raw matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Exactly one element selected
    One {
        /// Index among all matches
        index: usize,
        /// Its state
        element: ElementSnapshot,
    },
    /// Nothing selected
    Missing {
        /// Total matches (non-zero when `nth` is out of range)
        matches: usize,
    },
    /// Strict locator matched several elements
    Ambiguous {
        /// Total matches
        matches: usize,
    },
}

/// Select the element a locator designates among `snapshots`
#[must_use]
pub fn resolve(locator: &Locator, mut snapshots: Vec<ElementSnapshot>) -> Resolved {
    let matches = snapshots.len();
    match locator.index() {
        Some(index) if index < matches => Resolved::One {
            index,
            element: snapshots.swap_remove(index),
        },
        Some(_) => Resolved::Missing { matches },
        None => match matches {
            0 => Resolved::Missing { matches },
            1 => Resolved::One {
                index: 0,
                element: snapshots.swap_remove(0),
            },
            _ => Resolved::Ambiguous { matches },
        },
    }
}

/// One browser tab as seen by the runner.
///
/// Implementations own the page exclusively; the runner never shares it.
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url` and return once `wait_until` is reached.
    ///
    /// Fails with `Navigation` when the target is unreachable and `Timeout`
    /// when the lifecycle signal does not arrive within `timeout`.
    async fn goto(&mut self, url: &str, wait_until: LoadState, timeout: Duration)
        -> ProbeResult<()>;

    /// URL of the current document
    async fn current_url(&self) -> ProbeResult<String>;

    /// `document.readyState` of the current document
    async fn ready_state(&self) -> ProbeResult<String>;

    /// Snapshot every element matched by the locator's selector, in
    /// document order. The locator's `nth` is not applied here.
    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementSnapshot>>;

    /// Write `value` into the `index`-th match
    async fn fill(&mut self, locator: &Locator, index: usize, value: &str) -> ProbeResult<()>;

    /// Activate the `index`-th match
    async fn click(&mut self, locator: &Locator, index: usize) -> ProbeResult<()>;

    /// Capture the rendered page as PNG bytes
    async fn screenshot(&mut self) -> ProbeResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clickable_requires_visible_and_enabled() {
        let mut snap = ElementSnapshot {
            visible: true,
            enabled: true,
            ..ElementSnapshot::default()
        };
        assert!(snap.is_clickable());
        assert!(!snap.is_fillable());
        snap.enabled = false;
        assert!(!snap.is_clickable());
    }

    #[test]
    fn test_describe_prefers_value() {
        let snap = ElementSnapshot {
            visible: false,
            enabled: false,
            editable: false,
            value: Some("1403/02/15".to_string()),
            text: "ignored".to_string(),
        };
        assert_eq!(snap.describe(), "hidden, disabled, value \"1403/02/15\"");
    }

    #[test]
    fn test_describe_truncates_long_text() {
        let snap = ElementSnapshot {
            visible: true,
            enabled: true,
            text: "x".repeat(100),
            ..ElementSnapshot::default()
        };
        assert!(snap.describe().ends_with("…\""));
    }

    fn visible(text: &str) -> ElementSnapshot {
        ElementSnapshot {
            visible: true,
            enabled: true,
            text: text.to_string(),
            ..ElementSnapshot::default()
        }
    }

    #[test]
    fn test_resolve_strict_single_match() {
        let resolved = resolve(&Locator::text("a"), vec![visible("a")]);
        assert!(matches!(resolved, Resolved::One { index: 0, .. }));
    }

    #[test]
    fn test_resolve_strict_many_is_ambiguous() {
        let resolved = resolve(&Locator::text("1"), vec![visible("1"), visible("15")]);
        assert_eq!(resolved, Resolved::Ambiguous { matches: 2 });
    }

    #[test]
    fn test_resolve_nth_picks_index() {
        let resolved = resolve(
            &Locator::text("1").nth(1),
            vec![visible("1"), visible("15")],
        );
        match resolved {
            Resolved::One { index, element } => {
                assert_eq!(index, 1);
                assert_eq!(element.text, "15");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_resolve_nth_out_of_range_is_missing() {
        let resolved = resolve(&Locator::text("1").nth(5), vec![visible("1")]);
        assert_eq!(resolved, Resolved::Missing { matches: 1 });
    }

    #[test]
    fn test_resolve_empty_is_missing() {
        assert_eq!(
            resolve(&Locator::text("x"), Vec::new()),
            Resolved::Missing { matches: 0 }
        );
    }

    #[test]
    fn test_snapshot_deserializes_browser_payload() {
        let json = r#"[{"visible":true,"enabled":true,"editable":true,"value":"","text":""}]"#;
        let snaps: Vec<ElementSnapshot> = serde_json::from_str(json).unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].value.as_deref(), Some(""));
    }
}

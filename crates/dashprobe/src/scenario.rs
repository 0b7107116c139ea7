//! Scenario YAML schema.
//!
//! A scenario is an ordered list of steps plus the fixture preconditions it
//! relies on. String fields may reference `${VAR}` variables declared under
//! `vars`; [`Scenario::resolve`] expands them and joins relative URLs to the
//! base URL.
//!
//! ```yaml
//! name: login
//! vars:
//!   USER: admin
//! steps:
//!   - action: navigate
//!     url: /login
//!   - action: fill
//!     locator: { by: label, label: Username }
//!     value: "${USER}"
//!   - action: expect_url
//!     pattern: { exact: /home }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::expect::{Expectation, ValuePattern};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};

/// One scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL and wait for the load event
    Navigate {
        /// Absolute URL, or a path joined to the base URL
        url: String,
    },
    /// Write a value into a form field
    Fill {
        /// Field to fill
        locator: Locator,
        /// Value to write
        value: String,
    },
    /// Activate an element
    Click {
        /// Element to click
        locator: Locator,
    },
    /// Assert visibility
    ExpectVisible {
        /// Element to check
        locator: Locator,
        /// Expected visibility
        #[serde(default = "default_visible")]
        visible: bool,
    },
    /// Assert the page URL
    ExpectUrl {
        /// URL condition; exact paths are joined to the base URL
        pattern: ValuePattern,
    },
    /// Assert a form field's value
    ExpectValue {
        /// Field to check
        locator: Locator,
        /// Value condition
        pattern: ValuePattern,
    },
    /// Capture the page to a PNG file
    Screenshot {
        /// Output path; parent directories are created
        path: PathBuf,
    },
}

const fn default_visible() -> bool {
    true
}

impl Step {
    /// Action name as written in YAML
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Fill { .. } => "fill",
            Self::Click { .. } => "click",
            Self::ExpectVisible { .. } => "expect_visible",
            Self::ExpectUrl { .. } => "expect_url",
            Self::ExpectValue { .. } => "expect_value",
            Self::Screenshot { .. } => "screenshot",
        }
    }

    /// The polling assertion behind an `expect_*` step
    #[must_use]
    pub fn expectation(&self) -> Option<Expectation> {
        match self {
            Self::ExpectVisible { locator, visible } => Some(Expectation::Visible {
                locator: locator.clone(),
                visible: *visible,
            }),
            Self::ExpectUrl { pattern } => Some(Expectation::Url {
                pattern: pattern.clone(),
            }),
            Self::ExpectValue { locator, pattern } => Some(Expectation::Value {
                locator: locator.clone(),
                pattern: pattern.clone(),
            }),
            _ => None,
        }
    }

    fn map_strings<E>(&self, mut f: impl FnMut(&str) -> Result<String, E>) -> Result<Self, E> {
        Ok(match self {
            Self::Navigate { url } => Self::Navigate { url: f(url)? },
            Self::Fill { locator, value } => Self::Fill {
                locator: locator.map_strings(&mut f)?,
                value: f(value)?,
            },
            Self::Click { locator } => Self::Click {
                locator: locator.map_strings(&mut f)?,
            },
            Self::ExpectVisible { locator, visible } => Self::ExpectVisible {
                locator: locator.map_strings(&mut f)?,
                visible: *visible,
            },
            Self::ExpectUrl { pattern } => Self::ExpectUrl {
                pattern: pattern.map_string(&mut f)?,
            },
            Self::ExpectValue { locator, pattern } => Self::ExpectValue {
                locator: locator.map_strings(&mut f)?,
                pattern: pattern.map_string(&mut f)?,
            },
            Self::Screenshot { path } => Self::Screenshot {
                path: PathBuf::from(f(&path.to_string_lossy())?),
            },
        })
    }

    fn with_base_url(self, base_url: &str) -> Self {
        match self {
            Self::Navigate { url } => Self::Navigate {
                url: join_url(base_url, &url),
            },
            Self::ExpectUrl {
                pattern: ValuePattern::Exact(url),
            } => Self::ExpectUrl {
                pattern: ValuePattern::Exact(join_url(base_url, &url)),
            },
            other => other,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigate { url } => write!(f, "navigate to {url}"),
            Self::Fill { locator, value } => write!(f, "fill {locator} with {value:?}"),
            Self::Click { locator } => write!(f, "click {locator}"),
            Self::Screenshot { path } => write!(f, "screenshot to {}", path.display()),
            other => match other.expectation() {
                Some(expectation) => write!(f, "expect {expectation}"),
                None => write!(f, "{}", other.action()),
            },
        }
    }
}

/// Fixture requirement a scenario depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    /// Short identifier used in failure messages
    pub name: String,
    /// What must hold
    #[serde(default)]
    pub description: String,
    /// Steps that check the requirement; empty means it is assumed
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Precondition {
    /// Whether this precondition is only assumed, never checked
    #[must_use]
    pub fn is_assumed(&self) -> bool {
        self.steps.is_empty()
    }
}

/// An end-to-end check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Variables available to `${VAR}` references
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Fixture requirements, checked in order before the steps
    #[serde(default)]
    pub preconditions: Vec<Precondition>,
    /// Steps to run
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse and validate a scenario.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or validation fails.
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let scenario: Self = serde_yaml_ng::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read, parse and validate a scenario file.
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read, otherwise as [`Self::from_yaml`].
    pub fn load(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ProbeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Override or add variables
    #[must_use]
    pub fn with_vars(mut self, overrides: &BTreeMap<String, String>) -> Self {
        self.vars
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Check the scenario can run.
    ///
    /// Rejects an empty step list, a first executed step that is not a
    /// navigation, unknown variables and invalid regular expressions.
    ///
    /// # Errors
    /// Returns `Scenario` describing the first problem found.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProbeError::scenario("scenario name is empty"));
        }
        if self.steps.is_empty() {
            return Err(ProbeError::scenario(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        if let Some(first) = self.all_steps().next() {
            if !matches!(first, Step::Navigate { .. }) {
                return Err(ProbeError::scenario(format!(
                    "first step must navigate, found '{}'",
                    first.action()
                )));
            }
        }
        for precondition in &self.preconditions {
            if precondition.name.trim().is_empty() {
                return Err(ProbeError::scenario("precondition name is empty"));
            }
        }

        let resolved = self.resolve("http://localhost")?;
        for step in resolved.all_steps() {
            match step {
                Step::ExpectUrl { pattern } | Step::ExpectValue { pattern, .. } => {
                    let _ = pattern.compile()?;
                }
                Step::Screenshot { path } if path.as_os_str().is_empty() => {
                    return Err(ProbeError::scenario("screenshot path is empty"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Expand `${VAR}` references and join relative URLs to `base_url`.
    ///
    /// # Errors
    /// Returns `Scenario` naming the first undefined variable.
    pub fn resolve(&self, base_url: &str) -> ProbeResult<Self> {
        let expand_steps = |steps: &[Step]| -> ProbeResult<Vec<Step>> {
            steps
                .iter()
                .map(|step| {
                    step.map_strings(|s| expand_vars(s, &self.vars))
                        .map(|step| step.with_base_url(base_url))
                })
                .collect()
        };

        let preconditions = self
            .preconditions
            .iter()
            .map(|p| {
                Ok(Precondition {
                    name: p.name.clone(),
                    description: expand_vars(&p.description, &self.vars)?,
                    steps: expand_steps(&p.steps)?,
                })
            })
            .collect::<ProbeResult<Vec<_>>>()?;

        Ok(Self {
            name: self.name.clone(),
            description: self.description.clone(),
            vars: self.vars.clone(),
            preconditions,
            steps: expand_steps(&self.steps)?,
        })
    }

    /// Precondition steps followed by the main steps, in run order
    pub fn all_steps(&self) -> impl Iterator<Item = &Step> {
        self.preconditions
            .iter()
            .flat_map(|p| p.steps.iter())
            .chain(self.steps.iter())
    }

    /// Human-readable outline
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!("{}\n", self.name);
        if !self.description.is_empty() {
            out.push_str(&format!("  {}\n", self.description));
        }
        for precondition in &self.preconditions {
            let mode = if precondition.is_assumed() {
                "assumed"
            } else {
                "checked"
            };
            out.push_str(&format!(
                "  precondition {} ({mode}): {}\n",
                precondition.name, precondition.description
            ));
            for step in &precondition.steps {
                out.push_str(&format!("      - {step}\n"));
            }
        }
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("  {:>2}. {step}\n", i + 1));
        }
        out
    }
}

/// Replace every `${NAME}` in `input` with its value from `vars`.
///
/// Text that does not form a valid reference is copied unchanged.
///
/// # Errors
/// Returns `Scenario` naming the first undefined variable.
pub fn expand_vars(input: &str, vars: &BTreeMap<String, String>) -> ProbeResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if is_var_name(&after[..end]) => {
                let name = &after[..end];
                let value = vars
                    .get(name)
                    .ok_or_else(|| ProbeError::scenario(format!("undefined variable ${{{name}}}")))?;
                out.push_str(value);
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Join a path starting with `/` to `base_url`; other URLs pass through
#[must_use]
pub fn join_url(base_url: &str, url: &str) -> String {
    if url.starts_with('/') {
        format!("{}{url}", base_url.trim_end_matches('/'))
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ErrorKind;

    const LOGIN_SCENARIO: &str = r#"
name: login
description: admin can log in
vars:
  USER: admin
preconditions:
  - name: admin-account
    description: "account ${USER} exists"
steps:
  - action: navigate
    url: /login
  - action: fill
    locator: { by: label, label: Username }
    value: "${USER}"
  - action: click
    locator: { by: role, role: button, name: Sign in }
  - action: expect_url
    pattern: { exact: /home }
  - action: expect_visible
    locator: { by: text, text: "N/A" }
    visible: false
  - action: expect_value
    locator: { by: placeholder, placeholder: End date }
    pattern: { regex: '\d{4}/\d{2}/\d{2}' }
  - action: screenshot
    path: out/shot.png
"#;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_all_actions() {
            let scenario = Scenario::from_yaml(LOGIN_SCENARIO).unwrap();
            let actions: Vec<_> = scenario.steps.iter().map(Step::action).collect();
            assert_eq!(
                actions,
                [
                    "navigate",
                    "fill",
                    "click",
                    "expect_url",
                    "expect_visible",
                    "expect_value",
                    "screenshot"
                ]
            );
            assert!(scenario.preconditions[0].is_assumed());
        }

        #[test]
        fn test_expect_visible_defaults_to_true() {
            let yaml = "action: expect_visible\nlocator: { by: text, text: hi }\n";
            let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(
                step,
                Step::ExpectVisible {
                    locator: Locator::text("hi"),
                    visible: true
                }
            );
        }

        #[test]
        fn test_unknown_action_rejected() {
            let yaml = "name: x\nsteps:\n  - action: hover\n    locator: { by: text, text: a }\n";
            let err = Scenario::from_yaml(yaml).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ScenarioError);
        }

        #[test]
        fn test_step_display() {
            let step = Step::Fill {
                locator: Locator::label("کد ملی"),
                value: "admin".to_string(),
            };
            assert_eq!(step.to_string(), "fill label \"کد ملی\" with \"admin\"");
            let step = Step::ExpectVisible {
                locator: Locator::text("N/A"),
                visible: false,
            };
            assert_eq!(step.to_string(), "expect text \"N/A\" not to be visible");
        }
    }

    mod validate_tests {
        use super::*;

        fn scenario(steps: Vec<Step>) -> Scenario {
            Scenario {
                name: "t".to_string(),
                description: String::new(),
                vars: BTreeMap::new(),
                preconditions: Vec::new(),
                steps,
            }
        }

        #[test]
        fn test_empty_steps_rejected() {
            assert!(scenario(Vec::new()).validate().is_err());
        }

        #[test]
        fn test_first_step_must_navigate() {
            let err = scenario(vec![Step::Click {
                locator: Locator::text("x"),
            }])
            .validate()
            .unwrap_err();
            assert!(err.to_string().contains("must navigate"));
        }

        #[test]
        fn test_precondition_steps_count_as_first() {
            let mut s = scenario(vec![Step::Click {
                locator: Locator::text("x"),
            }]);
            s.preconditions.push(Precondition {
                name: "reachable".to_string(),
                description: String::new(),
                steps: vec![Step::Navigate {
                    url: "/".to_string(),
                }],
            });
            assert!(s.validate().is_ok());
        }

        #[test]
        fn test_unknown_variable_rejected() {
            let err = scenario(vec![Step::Navigate {
                url: "${HOST}/x".to_string(),
            }])
            .validate()
            .unwrap_err();
            assert!(err.to_string().contains("${HOST}"));
        }

        #[test]
        fn test_invalid_regex_rejected() {
            let err = scenario(vec![
                Step::Navigate {
                    url: "/".to_string(),
                },
                Step::ExpectUrl {
                    pattern: ValuePattern::Regex("[".to_string()),
                },
            ])
            .validate()
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ScenarioError);
        }

        #[test]
        fn test_load_missing_file_is_io_error() {
            let err = Scenario::load("/definitely/not/here.yaml").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IoError);
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("login.yaml");
            std::fs::write(&path, LOGIN_SCENARIO).unwrap();
            assert_eq!(Scenario::load(&path).unwrap().name, "login");
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_expand_vars() {
            let vars = BTreeMap::from([("A".to_string(), "1".to_string())]);
            assert_eq!(expand_vars("x${A}y${A}", &vars).unwrap(), "x1y1");
            assert_eq!(expand_vars("no vars", &vars).unwrap(), "no vars");
            assert_eq!(expand_vars("$A {A}", &vars).unwrap(), "$A {A}");
            assert!(expand_vars("${B}", &vars).is_err());
        }

        #[test]
        fn test_join_url() {
            assert_eq!(
                join_url("http://localhost:5173/", "/login"),
                "http://localhost:5173/login"
            );
            assert_eq!(join_url("http://a", "http://b/x"), "http://b/x");
        }

        #[test]
        fn test_resolve_expands_and_joins() {
            let scenario = Scenario::from_yaml(LOGIN_SCENARIO).unwrap();
            let resolved = scenario.resolve("http://localhost:5173").unwrap();
            assert_eq!(
                resolved.steps[0],
                Step::Navigate {
                    url: "http://localhost:5173/login".to_string()
                }
            );
            assert!(matches!(
                &resolved.steps[1],
                Step::Fill { value, .. } if value == "admin"
            ));
            assert_eq!(
                resolved.steps[3],
                Step::ExpectUrl {
                    pattern: ValuePattern::Exact("http://localhost:5173/home".to_string())
                }
            );
            assert_eq!(resolved.preconditions[0].description, "account admin exists");
        }

        #[test]
        fn test_overrides_win() {
            let scenario = Scenario::from_yaml(LOGIN_SCENARIO).unwrap().with_vars(
                &BTreeMap::from([("USER".to_string(), "root".to_string())]),
            );
            let resolved = scenario.resolve("http://h").unwrap();
            assert!(matches!(
                &resolved.steps[1],
                Step::Fill { value, .. } if value == "root"
            ));
        }

        #[test]
        fn test_describe_lists_steps() {
            let text = Scenario::from_yaml(LOGIN_SCENARIO).unwrap().describe();
            assert!(text.starts_with("login\n"));
            assert!(text.contains(" 1. navigate to /login"));
            assert!(text.contains("precondition admin-account (assumed)"));
        }
    }
}

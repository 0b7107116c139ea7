//! Built-in verification scenario for the insurance portal.
//!
//! Logs in as the administrator, checks that the installments tab no longer
//! shows the "near expire" status and its summary card, that picking a start
//! date on the policy issuance form fills the end date, then logs in as a
//! customer, checks that no "N/A" pay id is shown and captures a screenshot.

use crate::result::ProbeResult;
use crate::scenario::Scenario;

/// YAML source of the built-in scenario
pub const ADMIN_DASHBOARD_YAML: &str = include_str!("../scenarios/admin_dashboard.yaml");

/// Where the final screenshot goes unless `SCREENSHOT_PATH` is overridden
pub const DEFAULT_SCREENSHOT_PATH: &str = "verification/verification.png";

/// Variable holding the screenshot path
pub const SCREENSHOT_PATH_VAR: &str = "SCREENSHOT_PATH";

/// Parse the built-in scenario
///
/// # Errors
///
/// Returns `Scenario` if the embedded YAML is invalid
pub fn admin_dashboard_scenario() -> ProbeResult<Scenario> {
    Scenario::from_yaml(ADMIN_DASHBOARD_YAML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::ValuePattern;
    use crate::locator::Locator;
    use crate::scenario::Step;

    #[test]
    fn test_embedded_scenario_is_valid() {
        let scenario = admin_dashboard_scenario().unwrap();
        assert_eq!(scenario.name, "admin-dashboard-changes");
        assert_eq!(
            scenario.vars.get(SCREENSHOT_PATH_VAR).map(String::as_str),
            Some(DEFAULT_SCREENSHOT_PATH)
        );
    }

    #[test]
    fn test_step_order_matches_the_checks() {
        let scenario = admin_dashboard_scenario().unwrap();
        let actions: Vec<_> = scenario.steps.iter().map(Step::action).collect();
        assert_eq!(
            actions,
            [
                "navigate",
                "fill",
                "fill",
                "click",
                "expect_url",
                "click",
                "expect_visible",
                "expect_visible",
                "click",
                "click",
                "click",
                "click",
                "expect_value",
                "click",
                "navigate",
                "fill",
                "fill",
                "click",
                "expect_url",
                "expect_visible",
                "screenshot",
            ]
        );
    }

    #[test]
    fn test_day_picker_uses_first_match() {
        let scenario = admin_dashboard_scenario().unwrap();
        assert!(scenario.steps.contains(&Step::Click {
            locator: Locator::text("15").first()
        }));
    }

    #[test]
    fn test_end_date_pattern() {
        let scenario = admin_dashboard_scenario().unwrap();
        let pattern = scenario
            .steps
            .iter()
            .find_map(|s| match s {
                Step::ExpectValue { pattern, .. } => Some(pattern.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(pattern, ValuePattern::Regex(r"\d{4}/\d{2}/\d{2}".to_string()));
    }

    #[test]
    fn test_preconditions_declared() {
        let scenario = admin_dashboard_scenario().unwrap();
        let names: Vec<_> = scenario.preconditions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["portal-reachable", "admin-account", "customer-account", "policy-without-pay-id"]
        );
        assert!(!scenario.preconditions[0].is_assumed());
        assert!(scenario.preconditions[1].is_assumed());
    }

    #[test]
    fn test_resolved_urls_use_base() {
        let scenario = admin_dashboard_scenario()
            .unwrap()
            .resolve("http://localhost:5173")
            .unwrap();
        assert!(scenario.steps.contains(&Step::ExpectUrl {
            pattern: ValuePattern::Exact("http://localhost:5173/admin-dashboard".to_string())
        }));
        assert!(scenario.steps.contains(&Step::ExpectUrl {
            pattern: ValuePattern::Exact("http://localhost:5173/customer-dashboard".to_string())
        }));
    }
}

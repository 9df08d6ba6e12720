//! Completion council configuration from TOML (`[council]` section)

use crate::config::issue::{ConfigIssue, Severity};
use autopilot_application::CouncilParams;
use autopilot_domain::CouncilRule;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw council configuration from TOML
///
/// # Example
///
/// ```toml
/// [council]
/// size = 3                    # members asked per round (0 disables the council)
/// interval = 5                # vote every N iterations
/// min_iterations = 3
/// rule = "two_thirds"         # "two_thirds", "unanimous", "atleast:N"
/// vote_timeout_secs = 300
/// stagnation_limit = 5        # unchanged workspace fingerprints that force a vote
/// devils_advocate = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    pub size: usize,
    pub interval: u64,
    pub min_iterations: u64,
    pub rule: String,
    pub vote_timeout_secs: u64,
    pub stagnation_limit: u32,
    pub devils_advocate: bool,
}

impl Default for FileCouncilConfig {
    fn default() -> Self {
        let params = CouncilParams::default();
        Self {
            size: params.size,
            interval: params.schedule.interval,
            min_iterations: params.schedule.min_iterations,
            rule: "two_thirds".to_string(),
            vote_timeout_secs: params.vote_timeout.as_secs(),
            stagnation_limit: params.stagnation_limit,
            devils_advocate: params.devils_advocate,
        }
    }
}

impl FileCouncilConfig {
    pub fn parse_rule(&self) -> (CouncilRule, Vec<ConfigIssue>) {
        match self.rule.parse::<CouncilRule>() {
            Ok(rule) => (rule, vec![]),
            Err(_) => {
                let issue = ConfigIssue::invalid_enum(
                    Severity::Warning,
                    "council.rule",
                    &self.rule,
                    &["two_thirds", "unanimous", "atleast:N"],
                    format!(
                        "council.rule: unknown value '{}', falling back to 'two_thirds'",
                        self.rule
                    ),
                );
                (CouncilRule::TwoThirds, vec![issue])
            }
        }
    }

    pub fn to_params(&self) -> (CouncilParams, Vec<ConfigIssue>) {
        let (rule, mut issues) = self.parse_rule();
        if self.vote_timeout_secs == 0 {
            issues.push(ConfigIssue::out_of_range(
                Severity::Error,
                "council.vote_timeout_secs",
                "council.vote_timeout_secs cannot be 0",
            ));
        }
        if self.size > 0 && rule.is_below_two_thirds(self.size) {
            issues.push(ConfigIssue::out_of_range(
                Severity::Error,
                "council.rule",
                format!(
                    "council.rule '{}' is below two thirds of {} members; at least {} yes votes are required",
                    self.rule,
                    self.size,
                    CouncilRule::TwoThirds.min_yes_needed(self.size)
                ),
            ));
        }
        if let CouncilRule::AtLeast(n) = rule
            && n > self.size
        {
            issues.push(ConfigIssue::out_of_range(
                Severity::Warning,
                "council.rule",
                format!(
                    "council.rule requires {} yes votes but the council has {} members; it can never complete the run",
                    n, self.size
                ),
            ));
        }
        if self.size > 0 && self.interval == 0 && self.stagnation_limit == 0 {
            issues.push(ConfigIssue::out_of_range(
                Severity::Warning,
                "council.interval",
                "council.interval and council.stagnation_limit are both 0; the council never votes",
            ));
        }

        let params = CouncilParams::default()
            .with_size(self.size)
            .with_interval(self.interval)
            .with_min_iterations(self.min_iterations)
            .with_vote_timeout(Duration::from_secs(self.vote_timeout_secs))
            .with_stagnation_limit(self.stagnation_limit)
            .with_devils_advocate(self.devils_advocate);
        (CouncilParams { rule, ..params }, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_params() {
        let (params, issues) = FileCouncilConfig::default().to_params();
        assert!(issues.is_empty());
        assert_eq!(params, CouncilParams::default());
    }

    #[test]
    fn test_unreachable_rule_warns() {
        let config = FileCouncilConfig {
            rule: "atleast:5".into(),
            ..Default::default()
        };
        let (params, issues) = config.to_params();
        assert_eq!(params.rule, CouncilRule::AtLeast(5));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_rule_below_two_thirds_is_an_error() {
        let config = FileCouncilConfig {
            rule: "atleast:1".into(),
            ..Default::default()
        };
        let (_, issues) = config.to_params();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);

        let five = FileCouncilConfig {
            size: 5,
            rule: "atleast:3".into(),
            ..Default::default()
        };
        assert!(five.to_params().1.iter().any(|i| i.is_error()));

        let strict = FileCouncilConfig {
            size: 5,
            rule: "atleast:4".into(),
            ..Default::default()
        };
        assert!(strict.to_params().1.is_empty());
    }

    #[test]
    fn test_majority_is_not_accepted() {
        let config = FileCouncilConfig {
            rule: "majority".into(),
            ..Default::default()
        };
        let (params, issues) = config.to_params();
        assert_eq!(params.rule, CouncilRule::TwoThirds);
        assert_eq!(issues.len(), 1);
    }
}

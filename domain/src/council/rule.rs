//! Threshold rules for council decisions

use serde::{Deserialize, Serialize};

/// Rule deciding whether enough members voted "complete"
///
/// Two thirds of the answering members is a floor for every rule: stricter
/// rules may be configured, weaker ones cannot. With three members, two yes
/// votes pass and one does not.
///
/// # Example
///
/// ```
/// use autopilot_domain::council::CouncilRule;
///
/// let rule = CouncilRule::TwoThirds;
/// assert!(rule.is_satisfied(2, 3));
/// assert!(!rule.is_satisfied(1, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CouncilRule {
    /// At least two thirds must vote yes
    #[default]
    TwoThirds,
    /// Every member must vote yes
    Unanimous,
    /// At least n yes votes, and never fewer than two thirds
    AtLeast(usize),
}

fn two_thirds_of(total: usize) -> usize {
    (total * 2).div_ceil(3)
}

impl CouncilRule {
    pub fn is_satisfied(&self, yes: usize, total: usize) -> bool {
        total > 0 && yes >= self.min_yes_needed(total)
    }

    /// Minimum yes votes needed out of `total`
    pub fn min_yes_needed(&self, total: usize) -> usize {
        match self {
            CouncilRule::TwoThirds => two_thirds_of(total),
            CouncilRule::Unanimous => total,
            CouncilRule::AtLeast(n) => (*n).max(two_thirds_of(total)),
        }
    }

    /// Whether the configured threshold is below two thirds of `total`
    /// members and will be raised to it.
    pub fn is_below_two_thirds(&self, total: usize) -> bool {
        matches!(self, CouncilRule::AtLeast(n) if *n < two_thirds_of(total))
    }

    pub fn description(&self) -> String {
        match self {
            CouncilRule::TwoThirds => "two thirds".to_string(),
            CouncilRule::Unanimous => "unanimous".to_string(),
            CouncilRule::AtLeast(n) => format!("at least {} yes votes", n),
        }
    }
}

impl std::fmt::Display for CouncilRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::str::FromStr for CouncilRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "two_thirds" | "two-thirds" | "2/3" => Ok(CouncilRule::TwoThirds),
            "unanimous" => Ok(CouncilRule::Unanimous),
            s if s.starts_with("atleast:") || s.starts_with("at_least:") => {
                let n: usize = s
                    .split(':')
                    .nth(1)
                    .ok_or("Missing number after atleast:")?
                    .parse()
                    .map_err(|_| "Invalid number for atleast")?;
                Ok(CouncilRule::AtLeast(n))
            }
            _ => Err(format!(
                "Unknown council rule: {}. Valid: two_thirds, unanimous, atleast:N",
                s
            )),
        }
    }
}

//! Vote response parsing for the completion council.
//!
//! Council members and the devil's advocate are external CLIs that answer in
//! free-form text. These functions extract the decision from that text. They
//! are conservative: anything ambiguous counts as "keep working".
//!
//! | Function | Expected marker |
//! |----------|-----------------|
//! | [`parse_completion_vote`] | `VOTE: COMPLETE` / `VOTE: CONTINUE` |
//! | [`parse_devils_advocate`] | `VERDICT: CONFIRM` / `VERDICT: CHALLENGE` |

use super::decision::DevilsAdvocateVerdict;
use crate::core::text::excerpt;

const MAX_REASONING_BYTES: usize = 2_000;

/// Find the value of the last `MARKER:` line (case-insensitive).
fn marker_value(response: &str, marker: &str) -> Option<String> {
    response.lines().rev().find_map(|line| {
        let upper = line.trim().trim_start_matches(['*', '#', '-', ' ']).to_uppercase();
        upper
            .strip_prefix(marker)
            .and_then(|rest| rest.trim_start().strip_prefix(':'))
            .map(|value| value.trim().trim_matches(['*', '`', '.']).to_string())
    })
}

/// Parse a council member's answer.
///
/// # Returns
///
/// `(complete, reasoning)`
///
/// # Examples
///
/// ```
/// use autopilot_domain::council::parsing::parse_completion_vote;
///
/// assert!(parse_completion_vote("All tests pass.\nVOTE: COMPLETE").0);
/// assert!(!parse_completion_vote("VOTE: CONTINUE").0);
/// assert!(!parse_completion_vote("The work is incomplete").0);
/// assert!(!parse_completion_vote("no idea").0);
/// ```
pub fn parse_completion_vote(response: &str) -> (bool, String) {
    let reasoning = excerpt(response, MAX_REASONING_BYTES);

    if let Some(value) = marker_value(response, "VOTE") {
        let complete = value.starts_with("COMPLETE") || value.starts_with("YES");
        return (complete, reasoning);
    }

    let upper = response.to_uppercase();
    let says_complete = upper.contains("COMPLETE")
        && !upper.contains("INCOMPLETE")
        && !upper.contains("NOT COMPLETE");
    let says_continue = upper.contains("CONTINUE") || upper.contains("NOT DONE");

    (says_complete && !says_continue, reasoning)
}

/// Parse the devil's advocate answer.
///
/// Only an explicit confirmation without any challenge confirms; everything
/// else challenges the unanimous vote.
pub fn parse_devils_advocate(response: &str) -> DevilsAdvocateVerdict {
    let reasoning = excerpt(response, MAX_REASONING_BYTES);

    let confirmed = match marker_value(response, "VERDICT") {
        Some(value) => value.starts_with("CONFIRM"),
        None => {
            let upper = response.to_uppercase();
            upper.contains("CONFIRM") && !upper.contains("CHALLENGE")
        }
    };

    if confirmed {
        DevilsAdvocateVerdict::Confirmed { reasoning }
    } else {
        DevilsAdvocateVerdict::Challenged { reasoning }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_marker_wins_over_body_text() {
        let response = "I considered whether to continue but everything is in place.\nVOTE: COMPLETE";
        assert!(parse_completion_vote(response).0);
    }

    #[test]
    fn test_last_vote_marker_is_used() {
        let response = "VOTE: COMPLETE\nActually no, the migration is missing.\nVOTE: CONTINUE";
        assert!(!parse_completion_vote(response).0);
    }

    #[test]
    fn test_markdown_decorated_marker() {
        assert!(parse_completion_vote("**VOTE: COMPLETE**").0);
        assert!(parse_completion_vote("- vote: yes").0);
    }

    #[test]
    fn test_keyword_fallback() {
        assert!(parse_completion_vote("The project is complete.").0);
        assert!(!parse_completion_vote("The project is not complete.").0);
        assert!(!parse_completion_vote("Complete-ish, but continue with docs").0);
    }

    #[test]
    fn test_reasoning_is_bounded() {
        let long = "x".repeat(10_000);
        let (_, reasoning) = parse_completion_vote(&long);
        assert!(reasoning.len() <= MAX_REASONING_BYTES + '…'.len_utf8());
    }

    #[test]
    fn test_devils_advocate_verdicts() {
        assert!(parse_devils_advocate("VERDICT: CONFIRM").is_confirmed());
        assert!(!parse_devils_advocate("VERDICT: CHALLENGE\nlint fails").is_confirmed());
        assert!(!parse_devils_advocate("I confirm, though I challenge the docs").is_confirmed());
        assert!(!parse_devils_advocate("").is_confirmed());
    }
}

//! Vote types for the completion council
//!
//! Each council member answers one question: is the run complete?

use serde::{Deserialize, Serialize};

/// A single member's vote on whether the run is complete
///
/// # Example
///
/// ```
/// use autopilot_domain::council::Vote;
///
/// let yes = Vote::complete("claude", "All acceptance criteria pass.");
/// assert!(yes.complete);
///
/// let no = Vote::continue_work("codex", "Integration tests are still red.");
/// assert!(!no.complete);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    /// Member identifier (e.g., "claude", "member-2")
    pub member: String,
    /// `true` = yes, the run is complete
    pub complete: bool,
    /// Reasoning given by the member
    pub reasoning: String,
}

impl Vote {
    pub fn new(member: impl Into<String>, complete: bool, reasoning: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            complete,
            reasoning: reasoning.into(),
        }
    }

    /// A "yes, stop the run" vote
    pub fn complete(member: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(member, true, reasoning)
    }

    /// A "no, keep iterating" vote
    pub fn continue_work(member: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(member, false, reasoning)
    }
}

/// Tallied votes of one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes_count: usize,
    pub no_count: usize,
    pub votes: Vec<Vote>,
}

impl VoteTally {
    pub fn from_votes(votes: Vec<Vote>) -> Self {
        let yes_count = votes.iter().filter(|v| v.complete).count();
        Self {
            yes_count,
            no_count: votes.len() - yes_count,
            votes,
        }
    }

    pub fn total(&self) -> usize {
        self.votes.len()
    }

    /// Every member voted yes (and there was at least one member)
    pub fn is_unanimous_yes(&self) -> bool {
        !self.votes.is_empty() && self.yes_count == self.votes.len()
    }

    /// Ratio of yes votes (0.0 to 1.0)
    pub fn approval_ratio(&self) -> f64 {
        if self.votes.is_empty() {
            0.0
        } else {
            self.yes_count as f64 / self.votes.len() as f64
        }
    }

    /// Visual summary, e.g. "[●●○]"
    pub fn vote_summary(&self) -> String {
        let mut summary = String::from("[");
        for vote in &self.votes {
            summary.push(if vote.complete { '●' } else { '○' });
        }
        summary.push(']');
        summary
    }

    /// Reasons given by the members that want to keep going
    pub fn dissent(&self) -> String {
        self.votes
            .iter()
            .filter(|v| !v.complete)
            .map(|v| format!("{}: {}", v.member, v.reasoning))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

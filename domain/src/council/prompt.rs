//! Prompt templates for council votes

use super::vote::VoteTally;
use crate::task::QueueStats;

/// What the council is shown when asked to vote
#[derive(Debug, Clone, PartialEq)]
pub struct CouncilBrief {
    pub iteration: u64,
    pub round: u32,
    pub phase_name: Option<String>,
    pub queue: QueueStats,
    /// One-line summaries of dead-lettered tasks
    pub dead_letters: Vec<String>,
}

impl CouncilBrief {
    fn render(&self) -> String {
        let mut out = format!(
            "Iteration: {}\nCouncil round: {}\nPhase: {}\n\nTask queue:\n- completed: {}\n- queued: {}\n- in progress: {}\n- retrying: {}\n- dead-lettered: {}\n",
            self.iteration,
            self.round,
            self.phase_name.as_deref().unwrap_or("-"),
            self.queue.completed,
            self.queue.queued,
            self.queue.in_progress,
            self.queue.stalled + self.queue.retrying,
            self.queue.dead_letter,
        );
        if !self.dead_letters.is_empty() {
            out.push_str("\nTasks that could not be finished:\n");
            for line in &self.dead_letters {
                out.push_str(&format!("- {}\n", line));
            }
        }
        out
    }
}

/// Templates for council member and devil's-advocate prompts
pub struct CouncilPrompt;

impl CouncilPrompt {
    pub fn vote(brief: &CouncilBrief) -> String {
        format!(
            r#"You are a member of a completion council reviewing an autonomous development run.
Inspect the repository in the current directory and decide whether the work is complete:
the requested features exist, the tests pass, and nothing obvious is left unfinished.

{}
Explain your reasoning briefly, then end your answer with exactly one line:
VOTE: COMPLETE
or
VOTE: CONTINUE

If you are unsure, vote CONTINUE."#,
            brief.render()
        )
    }

    pub fn devils_advocate(brief: &CouncilBrief, tally: &VoteTally) -> String {
        let mut reasons = String::new();
        for vote in &tally.votes {
            reasons.push_str(&format!("- {}: {}\n", vote.member, vote.reasoning));
        }
        format!(
            r#"Every council member voted that this autonomous development run is complete.
Your job is to argue the opposite. Inspect the repository in the current directory and look
for unfinished work, failing or missing tests, stubbed code, and broken documentation.

{}
Reasons given by the council:
{}
If you find a concrete problem, describe it and end with:
VERDICT: CHALLENGE
If you cannot find any, end with:
VERDICT: CONFIRM"#,
            brief.render(),
            reasons
        )
    }
}

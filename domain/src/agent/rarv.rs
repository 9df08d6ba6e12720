//! RARV worker cycle (Request, Act, Review, Verify)
//!
//! An agent requests its task, acts by handing it to the provider CLI,
//! reviews what came back, and verifies whether the task is done. The
//! provider is asked to end its answer with a status marker; [`verify`]
//! turns that marker into a [`Verification`].

use crate::core::text::excerpt;
use crate::task::Task;
use serde::{Deserialize, Serialize};

const MAX_OUTPUT_BYTES: usize = 4_000;

/// Checkpoints of the worker loop. Cancellation is observed between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarvStep {
    Request,
    Act,
    Review,
    Verify,
}

impl RarvStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RarvStep::Request => "request",
            RarvStep::Act => "act",
            RarvStep::Review => "review",
            RarvStep::Verify => "verify",
        }
    }
}

impl std::fmt::Display for RarvStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the verify step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Task finished; carries the trimmed output
    Done(String),
    /// Worth another attempt by the same agent
    Retry(String),
    /// The agent gives up; the task goes back through the queue's retry path
    Blocked(String),
}

/// Prompt handed to the provider for one attempt at `task`.
pub fn task_prompt(task: &Task, phase_name: Option<&str>, attempt: u32) -> String {
    let mut prompt = format!(
        r#"You are an autonomous {} agent working in the repository in the current directory.

Phase: {}
Task {}: {}
"#,
        task.role,
        phase_name.unwrap_or("-"),
        task.id,
        task.description
    );
    if attempt > 0 {
        prompt.push_str(&format!(
            "\nThis is attempt {} at this task. A previous attempt failed",
            attempt + 1
        ));
        match task.last_error() {
            Some(err) => prompt.push_str(&format!(": {}\n", err)),
            None => prompt.push_str(".\n"),
        }
    }
    prompt.push_str(
        r#"
Work through the task, review your own changes, and verify them (build, tests).
End your answer with exactly one line:
STATUS: DONE      (the task is finished and verified)
STATUS: RETRY     (you made progress but verification failed)
STATUS: BLOCKED   (the task cannot be finished as specified)"#,
    );
    prompt
}

/// Review and verify a provider answer.
///
/// An empty answer is retried. An answer without a status marker counts as
/// done, because the provider exited successfully.
pub fn verify(output: &str) -> Verification {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Verification::Retry("provider returned no output".to_string());
    }
    let summary = excerpt(trimmed, MAX_OUTPUT_BYTES);

    let status = trimmed.lines().rev().find_map(|line| {
        line.trim()
            .trim_start_matches(['*', '#', '-', ' '])
            .to_uppercase()
            .strip_prefix("STATUS:")
            .map(|v| v.trim().trim_matches(['*', '`', '.']).to_string())
    });

    match status.as_deref() {
        Some(s) if s.starts_with("RETRY") => Verification::Retry(summary),
        Some(s) if s.starts_with("BLOCKED") => Verification::Blocked(summary),
        _ => Verification::Done(summary),
    }
}

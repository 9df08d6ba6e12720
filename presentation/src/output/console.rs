//! Console output formatting

use autopilot_domain::{CouncilRound, DeadLetterEntry, RoundOutcome, SessionState, SessionStatus};
use colored::{ColoredString, Colorize};
use serde::Serialize;

/// Formats run state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the `status` report
    pub fn format_status(status: &SessionStatus) -> String {
        let session = &status.session;
        let mut output = String::new();

        output.push_str(&Self::header("Autopilot Session"));
        output.push('\n');
        output.push_str(&Self::field("Session:", session.id().as_str()));
        output.push_str(&format!(
            "{} {}\n",
            "State:".cyan().bold(),
            Self::state(status.state())
        ));
        if let Some(reason) = session.reason() {
            output.push_str(&Self::field("Reason:", reason));
        }
        output.push_str(&Self::field("Provider:", status.provider.as_str()));
        output.push_str(&Self::field("Phase:", &status.phase_label()));
        output.push_str(&Self::field("Iteration:", &status.iteration().to_string()));
        output.push_str(&Self::field(
            "Active agents:",
            &status.active_agents.to_string(),
        ));
        if let Some(outcome) = status.last_council_outcome {
            output.push_str(&format!(
                "{} {}\n",
                "Last council:".cyan().bold(),
                Self::outcome(outcome)
            ));
        }

        let q = &status.queue;
        output.push_str(&Self::section_header("Queue"));
        output.push_str(&format!(
            "  queued {}  in progress {}  stalled {}  retrying {}\n",
            q.queued, q.in_progress, q.stalled, q.retrying
        ));
        output.push_str(&format!(
            "  {} {}  {} {}  total {}\n",
            "completed".green(),
            q.completed,
            "dead letter".red(),
            q.dead_letter,
            q.total()
        ));

        output.push_str(&format!(
            "\n{}\n",
            format!(
                "started {}, updated {}",
                session.started_at().format("%Y-%m-%d %H:%M:%S UTC"),
                session.updated_at().format("%Y-%m-%d %H:%M:%S UTC")
            )
            .dimmed()
        ));
        output.push_str(&Self::footer());
        output
    }

    /// Format the `dead-letters` report
    pub fn format_dead_letters(entries: &[DeadLetterEntry]) -> String {
        if entries.is_empty() {
            return format!("{}\n", "No dead-lettered tasks.".green());
        }

        let mut output = format!(
            "{} {}\n",
            "Dead-lettered tasks:".red().bold(),
            entries.len()
        );
        for entry in entries {
            output.push_str(&format!(
                "\n{}\n",
                format!("── {} ──", entry.task.id).yellow().bold()
            ));
            output.push_str(&format!("  {}\n", entry.task.description));
            output.push_str(&format!(
                "  {} phase {}, {} retries, session {}, {}\n",
                "at".dimmed(),
                entry.task.phase,
                entry.task.retry_count(),
                entry.session_id,
                entry.dead_lettered_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            output.push_str(&Self::indent(&entry.reason, "  > "));
            output.push('\n');
        }
        output
    }

    /// One-line summary of a finalized council round
    pub fn format_round(round: &CouncilRound) -> String {
        let tally = round.tally();
        let mut line = format!(
            "Council round {} (iteration {}): {} {}/{} yes → {}",
            round.round(),
            round.iteration(),
            tally.vote_summary(),
            tally.yes_count,
            tally.total(),
            Self::outcome(round.outcome())
        );
        if let Some(verdict) = round.devils_advocate() {
            let label = if verdict.is_confirmed() {
                "confirmed".green()
            } else {
                "challenged".red()
            };
            line.push_str(&format!(" (devil's advocate {})", label));
        }
        line
    }

    /// Final line printed when `run` returns
    pub fn format_run_summary(status: &SessionStatus) -> String {
        let q = &status.queue;
        let mut output = format!(
            "\n{} {} after {} iterations: {} completed, {} dead-lettered",
            "Run finished:".bold(),
            Self::state(status.state()),
            status.iteration(),
            q.completed,
            q.dead_letter
        );
        if let Some(reason) = status.session.reason() {
            output.push_str(&format!(" ({})", reason));
        }
        output.push('\n');
        output
    }

    /// Format any report as JSON
    pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn state(state: SessionState) -> ColoredString {
        let label = state.label();
        match state {
            SessionState::Completed => label.green().bold(),
            SessionState::Failed | SessionState::MaxRetriesExceeded => label.red().bold(),
            SessionState::Paused | SessionState::Stopped => label.yellow().bold(),
            _ => label.cyan().bold(),
        }
    }

    fn outcome(outcome: RoundOutcome) -> ColoredString {
        match outcome {
            RoundOutcome::Complete => outcome.as_str().green(),
            RoundOutcome::Overturned => outcome.as_str().red(),
            _ => outcome.as_str().yellow(),
        }
    }

    fn field(label: &str, value: &str) -> String {
        format!("{} {}\n", label.cyan().bold(), value)
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

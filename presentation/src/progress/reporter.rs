//! Progress reporting for autonomous runs

use crate::output::console::ConsoleFormatter;
use autopilot_application::RunProgressNotifier;
use autopilot_domain::{AgentId, CouncilRound, DeadLetterEntry, SessionState, Task, TaskId};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with one bar per phase
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.phase_bar.lock()
            && let Some(pb) = guard.as_ref()
        {
            f(pb);
        }
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RunProgressNotifier for ProgressReporter {
    fn on_session_state(&self, state: SessionState) {
        if state.is_terminal() || state.is_paused() {
            self.println(format!("{} session {}", "->".cyan(), state.label().bold()));
        }
    }

    fn on_phase_start(&self, index: usize, name: &str, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::phase_style());
        pb.set_prefix(format!("Phase {}: {}", index + 1, name));
        pb.set_message("Starting...");
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut guard) = self.phase_bar.lock()
            && let Some(previous) = guard.replace(pb)
        {
            previous.finish_and_clear();
        }
    }

    fn on_phase_complete(&self, index: usize, name: &str) {
        if let Ok(mut guard) = self.phase_bar.lock()
            && let Some(pb) = guard.take()
        {
            let message = format!("Phase {} ({}) complete!", index + 1, name);
            pb.finish_with_message(message.green().to_string());
        }
    }

    fn on_task_started(&self, task: &Task, agent: &AgentId) {
        self.with_bar(|pb| pb.set_message(format!("{} → {}", agent, task.id)));
    }

    fn on_task_completed(&self, task: &Task) {
        self.with_bar(|pb| {
            pb.set_message(format!("{} {}", "v".green(), task.id));
            pb.inc(1);
        });
    }

    fn on_task_failed(&self, task: &TaskId, reason: &str) {
        self.println(format!("  {} {} {}", "x".red(), task, reason.dimmed()));
    }

    fn on_task_retry(&self, task: &TaskId, attempt: u32, delay: Duration) {
        self.with_bar(|pb| {
            pb.set_message(format!("retry {} #{} in {:?}", task, attempt, delay))
        });
    }

    fn on_dead_letter(&self, entry: &DeadLetterEntry) {
        self.with_bar(|pb| pb.inc(1));
        self.println(format!("  {} {}", "dead letter".red().bold(), entry.summary()));
    }

    fn on_council_round(&self, round: &CouncilRound) {
        self.println(format!("  {}", ConsoleFormatter::format_round(round)));
    }

    fn on_council_quorum_missed(&self, received: usize, required: usize) {
        self.println(format!(
            "  {} council quorum missed ({}/{} votes), continuing",
            "!".yellow(),
            received,
            required
        ));
    }
}

/// Simple text-based progress (no fancy UI), for non-terminal output
pub struct SimpleProgress;

impl RunProgressNotifier for SimpleProgress {
    fn on_session_state(&self, state: SessionState) {
        println!("{} session {}", "->".cyan(), state.label().bold());
    }

    fn on_phase_start(&self, index: usize, name: &str, total_tasks: usize) {
        println!(
            "{} {} ({} tasks)",
            "->".cyan(),
            format!("Phase {}: {}", index + 1, name).bold(),
            total_tasks
        );
    }

    fn on_task_completed(&self, task: &Task) {
        println!("  {} {}", "v".green(), task.id);
    }

    fn on_task_failed(&self, task: &TaskId, reason: &str) {
        println!("  {} {} ({})", "x".red(), task, reason);
    }

    fn on_dead_letter(&self, entry: &DeadLetterEntry) {
        println!("  {} {}", "dead letter".red(), entry.summary());
    }

    fn on_council_round(&self, round: &CouncilRound) {
        println!("  {}", ConsoleFormatter::format_round(round));
    }

    fn on_council_quorum_missed(&self, received: usize, required: usize) {
        println!(
            "  {} council quorum missed ({}/{} votes)",
            "!".yellow(),
            received,
            required
        );
    }

    fn on_phase_complete(&self, _index: usize, _name: &str) {
        println!();
    }
}

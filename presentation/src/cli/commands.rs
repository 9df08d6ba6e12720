//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for status and dead-letter reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for autopilot
#[derive(Parser, Debug)]
#[command(name = "autopilot")]
#[command(author, version, about = "Autonomous multi-agent runs driven by AI coding CLIs")]
#[command(long_about = r#"
Autopilot drives an AI coding CLI (claude, codex or gemini) through a backlog
of tasks, phase by phase, until the work is done.

Agents pick tasks from a persisted queue. Stalled tasks are retried and, once
the retry budget is spent, moved to a dead-letter log. Every few iterations a
completion council votes on whether the run has converged.

Configuration files are loaded from (in priority order):
1. --config <path>               Explicit config file
2. ./autopilot.toml              Project-level config
3. ~/.config/autopilot/config.toml   Global config
Environment variables (AUTOPILOT_SECTION__KEY) override files; flags override both.

Example:
  autopilot run --backlog backlog.json
  autopilot --provider codex run --backlog backlog.json
  autopilot status
  autopilot pause
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format for reports
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

/// Flags that take precedence over every configuration source
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// State directory (default: .autopilot)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Provider CLI to drive (claude, codex, gemini)
    #[arg(long, global = true, value_name = "NAME")]
    pub provider: Option<String>,

    /// Maximum number of agents running at once
    #[arg(long, global = true, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Iterations between completion council votes
    #[arg(long, global = true, value_name = "N")]
    pub council_interval: Option<u64>,

    /// Retry attempts before a task is dead-lettered
    #[arg(long, global = true, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Seconds before an in-progress task is considered stalled
    #[arg(long, global = true, value_name = "SECS")]
    pub stall_timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an autonomous run over a backlog
    Run {
        /// Backlog file (JSON: {"phases": [{"name": ..., "tasks": [...]}]})
        #[arg(short, long, value_name = "FILE")]
        backlog: PathBuf,

        /// Working directory the agents operate in (default: current directory)
        #[arg(long, value_name = "DIR")]
        workdir: Option<PathBuf>,
    },

    /// Show the state of the current or last run
    Status,

    /// Pause the running session
    Pause,

    /// Resume a paused session
    Resume,

    /// Stop the running session, keeping completed work. A session whose
    /// process died is marked stopped directly.
    Stop,

    /// Return a finished session to idle and clear its queue and council state
    Reset {
        /// Also reset a session that still looks active
        #[arg(long)]
        force: bool,
    },

    /// List tasks that exhausted their retry budget
    DeadLetters,

    /// Show configuration sources and the effective configuration
    Config,
}

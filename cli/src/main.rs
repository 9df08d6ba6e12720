//! CLI entrypoint for autopilot
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod logging;

use anyhow::{Context, Result, bail};
use autopilot_application::{
    ControlSink, DevilsAdvocate, NoProgress, RunProgressNotifier, SessionControlUseCase,
    SessionRepository, SessionRunner, StopOutcome,
};
use autopilot_domain::{Backlog, Provider, SessionState, SessionStatus};
use autopilot_infrastructure::{
    CliDevilsAdvocate, CliTaskExecutor, ConfigIssue, ConfigLoader, ConfigOverrides, FileConfig,
    FileControlChannel, FileStateStore, GitWorkspaceProbe, JsonlEventLogger, PidRunnerLiveness,
    ProviderCommand, RunnerLock, council_members,
};
use autopilot_presentation::{
    Cli, Command, ConsoleFormatter, OutputFormat, OverrideArgs, ProgressReporter, SimpleProgress,
};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::Config) {
        show_config(&cli)?;
        return Ok(ExitCode::SUCCESS);
    }

    let (config, warnings) = load_config(&cli)?;
    let store = Arc::new(FileStateStore::new(&config.session.state_dir));

    // Only a run writes the tracing log file
    let logs_dir = matches!(cli.command, Command::Run { .. }).then(|| store.layout().logs_dir());
    let _guard = logging::init(cli.verbose, logs_dir.as_deref());
    for issue in &warnings {
        warn!("{}", issue);
    }

    let control = Arc::new(FileControlChannel::new(store.layout().clone()));
    let use_case = SessionControlUseCase::new(store.clone(), store.clone(), control)
        .with_runner_liveness(Arc::new(PidRunnerLiveness::new(store.layout().clone())));

    match cli.command {
        Command::Run { backlog, workdir } => {
            let workdir = match workdir {
                Some(dir) => dir,
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            run(cli.quiet, cli.output, &config, store, &use_case, &backlog, workdir).await
        }
        Command::Status => {
            let status = use_case.status().await?;
            print_status(&status, cli.output);
            Ok(ExitCode::SUCCESS)
        }
        Command::Pause => {
            let status = use_case.pause().await?;
            println!("Pause requested for session {}", status.session.id());
            Ok(ExitCode::SUCCESS)
        }
        Command::Resume => {
            let status = use_case.resume().await?;
            println!("Resume requested for session {}", status.session.id());
            Ok(ExitCode::SUCCESS)
        }
        Command::Stop => {
            let (status, outcome) = use_case.stop().await?;
            let id = status.session.id();
            match outcome {
                StopOutcome::AlreadyFinished => println!("Session {} already {}", id, status.state()),
                StopOutcome::Requested => println!("Stop requested for session {}", id),
                StopOutcome::Recovered => {
                    println!("Session {} had no running process; marked stopped", id)
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Reset { force } => {
            let status = use_case.reset(force).await?;
            println!("Session {} reset to {}", status.session.id(), status.state());
            Ok(ExitCode::SUCCESS)
        }
        Command::DeadLetters => {
            let entries = use_case.dead_letters().await?;
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_dead_letters(&entries)),
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&entries)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => Ok(ExitCode::SUCCESS),
    }
}

fn overrides(args: &OverrideArgs) -> ConfigOverrides {
    ConfigOverrides {
        provider: args.provider.clone(),
        max_parallel: args.max_parallel,
        council_interval: args.council_interval,
        max_retries: args.max_retries,
        stall_timeout_secs: args.stall_timeout,
        state_dir: args.state_dir.clone(),
    }
}

/// Load, override and validate the configuration. Errors abort; warnings
/// are returned for logging once tracing is up.
fn load_config(cli: &Cli) -> Result<(FileConfig, Vec<ConfigIssue>)> {
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };
    overrides(&cli.overrides).apply(&mut config);
    let warnings = ConfigLoader::check(&config)?;
    Ok((config, warnings))
}

fn show_config(cli: &Cli) -> Result<()> {
    if !cli.no_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        println!();
    }
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };
    overrides(&cli.overrides).apply(&mut config);

    println!("Effective configuration:\n");
    println!("{}", config.to_toml_string()?);
    for issue in config.validate() {
        println!("{}", issue);
    }
    Ok(())
}

fn print_status(status: &SessionStatus, format: OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", ConsoleFormatter::format_status(status)),
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(status)),
    }
}

async fn run(
    quiet: bool,
    format: OutputFormat,
    config: &FileConfig,
    store: Arc<FileStateStore>,
    use_case: &SessionControlUseCase,
    backlog_path: &Path,
    workdir: PathBuf,
) -> Result<ExitCode> {
    let json = std::fs::read_to_string(backlog_path)
        .with_context(|| format!("Failed to read backlog {}", backlog_path.display()))?;
    let backlog = Backlog::from_json(&json)
        .with_context(|| format!("Invalid backlog {}", backlog_path.display()))?;

    let run_config = config.to_run_config();
    let provider: Provider = run_config.provider;
    let command = ProviderCommand::new(provider)
        .with_binary(config.provider.binary_for(provider))
        .with_args(config.provider.args.clone())
        .with_working_dir(&workdir);
    if !command.is_available() {
        bail!(
            "Provider CLI '{}' not found. Install it or set provider.binary in autopilot.toml",
            command.binary()
        );
    }

    if !use_case.can_start().await? {
        let previous = use_case.status().await?;
        bail!(
            "Session {} is still {} in another process. Stop it (autopilot stop) first",
            previous.session.id(),
            previous.state()
        );
    }
    let _lock = RunnerLock::acquire(store.layout())?;
    store.clear_run_state().await?;
    let control = Arc::new(FileControlChannel::new(store.layout().clone()));
    control.clear().await?;

    let progress: Arc<dyn RunProgressNotifier> = if quiet {
        Arc::new(NoProgress)
    } else if std::io::stdout().is_terminal() {
        Arc::new(ProgressReporter::new())
    } else {
        Arc::new(SimpleProgress)
    };

    // === Dependency Injection ===
    let members = council_members(&command, run_config.council.size);
    let devils_advocate = run_config.council.devils_advocate.then(|| {
        Arc::new(CliDevilsAdvocate::new(command.clone())) as Arc<dyn DevilsAdvocate>
    });

    let mut runner = SessionRunner::new(
        run_config,
        Arc::new(CliTaskExecutor::new(command)),
        store.clone(),
        store.clone(),
        store.clone(),
    )
    .with_council(members, devils_advocate)
    .with_control_source(control)
    .with_workspace_probe(Arc::new(GitWorkspaceProbe::new(&workdir)))
    .with_progress(progress);
    if let Some(events) = JsonlEventLogger::new(&store.layout().events()) {
        runner = runner.with_event_logger(Arc::new(events));
    }

    let handle = runner.handle();
    info!(
        "Starting session {} in {}",
        handle.session_id(),
        workdir.display()
    );
    if !quiet {
        println!(
            "Session {} started (state in {})",
            handle.session_id(),
            store.layout().root().display()
        );
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after in-flight steps");
            handle.stop();
        }
    });

    let status = runner.run(backlog).await?;
    match format {
        OutputFormat::Text => print!("{}", ConsoleFormatter::format_run_summary(&status)),
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&status)),
    }

    Ok(match status.state() {
        SessionState::Completed | SessionState::Stopped => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

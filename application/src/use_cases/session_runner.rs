//! Session runner
//!
//! Drives the single session of a run through its SDLC phases:
//!
//! ```text
//! idle → initializing → running → phase_0 … phase_n → completing → completed
//! ```
//!
//! Each pass of the loop polls control signals, promotes stalled tasks
//! through the retry path, advances resolved phases, and dispatches queued
//! tasks to agents up to the provider's concurrency bound. Every processed
//! worker result is one iteration; the completion council is consulted on
//! its schedule and may end the run early.
//!
//! The runner is controlled in-process through a cloneable
//! [`SessionHandle`] and out-of-process through a [`ControlSource`].

use crate::config::RunConfig;
use crate::ports::control::{ControlSignal, ControlSource, NoControl};
use crate::ports::council_member::{CouncilMember, DevilsAdvocate};
use crate::ports::event_logger::{EventLogger, NoEventLogger, RunEvent};
use crate::ports::progress::{NoProgress, RunProgressNotifier};
use crate::ports::state_store::{
    CouncilRepository, QueueRepository, SessionRepository, StoreError,
};
use crate::ports::task_executor::TaskExecutor;
use crate::ports::workspace_probe::{NoWorkspaceProbe, WorkspaceProbe};
use crate::use_cases::agent_controller::{AgentController, WorkerOutcome, WorkerReport};
use crate::use_cases::completion_council::{CompletionCouncil, CouncilError};
use crate::use_cases::queue_store::{QueueError, TaskQueueStore};
use crate::use_cases::retry_manager::{RetryManager, RetryOutcome};
use autopilot_domain::{
    Backlog, CouncilBrief, DomainError, RoundOutcome, Session, SessionContext, SessionId,
    SessionState, SessionStatus,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors from starting or controlling a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No session has been recorded yet")]
    NoSession,
}

/// In-process control surface of a running session
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    commands: mpsc::UnboundedSender<ControlSignal>,
    status: watch::Receiver<SessionStatus>,
    token: CancellationToken,
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns false once the runner has finished.
    pub fn pause(&self) -> bool {
        self.commands.send(ControlSignal::Pause).is_ok()
    }

    pub fn resume(&self) -> bool {
        self.commands.send(ControlSignal::Resume).is_ok()
    }

    /// Request a stop. In-flight agents stop at their next checkpoint.
    pub fn stop(&self) {
        let _ = self.commands.send(ControlSignal::Stop);
        self.token.cancel();
    }

    /// Latest published status
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }
}

pub struct SessionRunner {
    config: RunConfig,
    context: SessionContext,
    executor: Arc<dyn TaskExecutor>,
    members: Vec<Arc<dyn CouncilMember>>,
    devils_advocate: Option<Arc<dyn DevilsAdvocate>>,
    queue_repo: Arc<dyn QueueRepository>,
    council_repo: Arc<dyn CouncilRepository>,
    session_repo: Arc<dyn SessionRepository>,
    control: Arc<dyn ControlSource>,
    probe: Arc<dyn WorkspaceProbe>,
    events: Arc<dyn EventLogger>,
    progress: Arc<dyn RunProgressNotifier>,
    token: CancellationToken,
    commands_tx: mpsc::UnboundedSender<ControlSignal>,
    commands: mpsc::UnboundedReceiver<ControlSignal>,
    status_tx: watch::Sender<SessionStatus>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl SessionRunner {
    pub fn new(
        config: RunConfig,
        executor: Arc<dyn TaskExecutor>,
        queue_repo: Arc<dyn QueueRepository>,
        council_repo: Arc<dyn CouncilRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        let now = Utc::now();
        let context = SessionContext::generate(now);
        let initial = SessionStatus::new(
            Session::new(context.session_id.clone(), now),
            config.provider,
        );
        let (status_tx, status_rx) = watch::channel(initial);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        Self {
            config,
            context,
            executor,
            members: Vec::new(),
            devils_advocate: None,
            queue_repo,
            council_repo,
            session_repo,
            control: Arc::new(NoControl),
            probe: Arc::new(NoWorkspaceProbe),
            events: Arc::new(NoEventLogger),
            progress: Arc::new(NoProgress),
            token: CancellationToken::new(),
            commands_tx,
            commands,
            status_tx,
            status_rx,
        }
    }

    pub fn with_council(
        mut self,
        members: Vec<Arc<dyn CouncilMember>>,
        devils_advocate: Option<Arc<dyn DevilsAdvocate>>,
    ) -> Self {
        self.members = members;
        self.devils_advocate = devils_advocate;
        self
    }

    pub fn with_control_source(mut self, control: Arc<dyn ControlSource>) -> Self {
        self.control = control;
        self
    }

    pub fn with_workspace_probe(mut self, probe: Arc<dyn WorkspaceProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_event_logger(mut self, events: Arc<dyn EventLogger>) -> Self {
        self.events = events;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn RunProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            session_id: self.context.session_id.clone(),
            commands: self.commands_tx.clone(),
            status: self.status_rx.clone(),
            token: self.token.clone(),
        }
    }

    /// Run `backlog` to a terminal state and return the final status.
    ///
    /// Failures during the run end the session in `failed` (or
    /// `max_retries_exceeded`) and are reported through the returned status;
    /// only a session that cannot be initialized is an error.
    pub async fn run(self, backlog: Backlog) -> Result<SessionStatus, SessionError> {
        let SessionRunner {
            config,
            context,
            executor,
            members,
            devils_advocate,
            queue_repo,
            council_repo,
            session_repo,
            control,
            probe,
            events,
            progress,
            token,
            commands_tx,
            commands,
            status_tx,
            status_rx: _,
        } = self;

        let mut session = Session::new(context.session_id.clone(), context.started_at);
        session.initialize(backlog.phase_count(), Utc::now())?;
        info!(
            "Session {} starting: {} phase(s), {} task(s), provider {} x{}",
            context.session_id,
            backlog.phase_count(),
            backlog.task_count(),
            config.provider,
            config.concurrency()
        );
        if config.provider.is_degraded() {
            warn!(
                "Provider {} runs in degraded mode (one agent at a time)",
                config.provider
            );
        }

        let queue = Arc::new(
            TaskQueueStore::new(
                queue_repo,
                config.execution.stall_timeout,
                context.clone(),
            )
            .with_event_logger(Arc::clone(&events)),
        );
        let controller = Arc::new(
            AgentController::new(
                executor,
                Arc::clone(&queue),
                config.concurrency(),
                &config.execution,
            )
            .with_progress(Arc::clone(&progress))
            .with_event_logger(Arc::clone(&events)),
        );
        let retry = RetryManager::new(
            Arc::clone(&queue),
            config.retry,
            config.execution.session_max_retries,
            token.clone(),
        );
        let mut council =
            CompletionCouncil::new(members, config.council.clone(), council_repo, context.clone())
                .with_event_logger(Arc::clone(&events));
        if let Some(reviewer) = devils_advocate {
            council = council.with_devils_advocate(reviewer);
        }
        let sweeper = queue.spawn_sweeper(config.execution.sweep_interval, token.clone());

        let driver = Driver {
            session,
            backlog,
            config,
            queue,
            controller,
            retry,
            council,
            workers: JoinSet::new(),
            dead_letters: Vec::new(),
            last_council_outcome: None,
            session_repo,
            control,
            probe,
            events,
            progress,
            token,
            _commands_tx: commands_tx,
            commands,
            status_tx,
        };
        Ok(driver.drive(sweeper).await)
    }
}

/// Why the loop ended
enum Halt {
    Completed,
    Stop(String),
    Fail(String),
    MaxRetries(String),
}

impl From<DomainError> for Halt {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::MaxRetriesExceeded { .. } => Halt::MaxRetries(e.to_string()),
            DomainError::Cancelled => Halt::Stop(e.to_string()),
            other => Halt::Fail(other.to_string()),
        }
    }
}

impl From<QueueError> for Halt {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Domain(e) => e.into(),
            QueueError::Store(e) => Halt::Fail(e.to_string()),
        }
    }
}

impl From<StoreError> for Halt {
    fn from(e: StoreError) -> Self {
        Halt::Fail(e.to_string())
    }
}

struct Driver {
    session: Session,
    backlog: Backlog,
    config: RunConfig,
    queue: Arc<TaskQueueStore>,
    controller: Arc<AgentController>,
    retry: RetryManager,
    council: CompletionCouncil,
    workers: JoinSet<Result<WorkerReport, QueueError>>,
    dead_letters: Vec<String>,
    last_council_outcome: Option<RoundOutcome>,
    session_repo: Arc<dyn SessionRepository>,
    control: Arc<dyn ControlSource>,
    probe: Arc<dyn WorkspaceProbe>,
    events: Arc<dyn EventLogger>,
    progress: Arc<dyn RunProgressNotifier>,
    token: CancellationToken,
    // Keeps the command channel open while the handle is dropped
    _commands_tx: mpsc::UnboundedSender<ControlSignal>,
    commands: mpsc::UnboundedReceiver<ControlSignal>,
    status_tx: watch::Sender<SessionStatus>,
}

impl Driver {
    async fn drive(mut self, sweeper: JoinHandle<()>) -> SessionStatus {
        self.state_changed().await;
        let halt = match self.work().await {
            Ok(()) => Halt::Completed,
            Err(halt) => halt,
        };

        self.token.cancel();
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(Ok(report)) => debug!(
                    "Agent {} wound down on task {}: {:?}",
                    report.agent_id, report.task_id, report.outcome
                ),
                Ok(Err(e)) => warn!("Worker failed during shutdown: {}", e),
                Err(e) => warn!("Worker task join error: {}", e),
            }
        }
        if let Err(e) = sweeper.await {
            warn!("Sweeper join error: {}", e);
        }

        let now = Utc::now();
        match halt {
            Halt::Completed => {
                info!(
                    "Session {} completed after {} iteration(s)",
                    self.session.id(),
                    self.session.iteration()
                );
            }
            Halt::Stop(reason) => {
                info!("Session {} stopped: {}", self.session.id(), reason);
                self.session.stop(reason, now);
            }
            Halt::Fail(reason) => {
                error!("Session {} failed: {}", self.session.id(), reason);
                if let Err(e) = self.session.fail(reason.clone(), now) {
                    warn!("{}", e);
                    self.session.stop(reason, now);
                }
            }
            Halt::MaxRetries(reason) => {
                error!("Session {} gave up: {}", self.session.id(), reason);
                if let Err(e) = self.session.exceed_max_retries(reason.clone(), now) {
                    warn!("{}", e);
                    self.session.stop(reason, now);
                }
            }
        }
        self.state_changed().await;
        self.status_tx.borrow().clone()
    }

    async fn work(&mut self) -> Result<(), Halt> {
        self.session.start(Utc::now())?;
        self.state_changed().await;

        loop {
            if self.token.is_cancelled() {
                return Err(Halt::Stop("stop requested".into()));
            }
            if let Some(signal) = self.control.poll().await {
                self.apply(signal).await?;
            }
            if self.session.state().is_paused() {
                self.wait().await?;
                continue;
            }

            for outcome in self.retry.handle_stalled(self.progress.as_ref()).await? {
                if let RetryOutcome::DeadLettered(entry) = outcome {
                    self.dead_letters.push(entry.summary());
                }
            }
            self.advance().await?;

            if self.session.state() == SessionState::Completing {
                if self.workers.is_empty() {
                    self.session.complete(Utc::now())?;
                    self.state_changed().await;
                    return Ok(());
                }
            } else {
                self.dispatch().await?;
            }
            self.wait().await?;
        }
    }

    /// Leave every resolved phase; enqueue the tasks of the phase entered.
    /// An empty phase resolves immediately.
    async fn advance(&mut self) -> Result<(), Halt> {
        loop {
            match self.session.state() {
                SessionState::Running if self.session.phase_count() == 0 => {
                    self.session.begin_completion(Utc::now())?;
                    self.state_changed().await;
                    return Ok(());
                }
                SessionState::Running => {}
                SessionState::Phase(n) => {
                    if !self.queue.phase_resolved(n).await {
                        return Ok(());
                    }
                    let name = self.backlog.phase_name(n).unwrap_or_default().to_string();
                    info!("Phase {} ({}) resolved", n, name);
                    self.progress.on_phase_complete(n, &name);
                    if self.session.in_last_phase() {
                        self.session.begin_completion(Utc::now())?;
                        self.state_changed().await;
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }

            let next = self.session.advance_phase(true, Utc::now())?;
            let tasks = self.backlog.tasks_for_phase(next);
            let name = self.backlog.phase_name(next).unwrap_or_default();
            info!("Entering phase {} ({}) with {} task(s)", next, name, tasks.len());
            self.progress.on_phase_start(next, name, tasks.len());
            self.queue.enqueue_all(tasks).await?;
            self.state_changed().await;
        }
    }

    async fn dispatch(&mut self) -> Result<(), Halt> {
        let mut started = 0;
        while self.controller.has_capacity().await {
            let Some(task) = self.queue.pick().await? else {
                break;
            };
            let agent_id = match self.controller.start(&task).await {
                Ok(agent_id) => agent_id,
                Err(QueueError::Domain(e)) => {
                    warn!("Could not start task {}: {}", task.id, e);
                    self.queue.fail(&task.id, task.attempt(), e.to_string()).await?;
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            let phase_name = self.backlog.phase_name(task.phase).map(str::to_string);
            self.workers.spawn(Arc::clone(&self.controller).run(
                agent_id,
                task,
                phase_name,
                self.token.clone(),
            ));
            started += 1;
        }
        if started > 0 {
            debug!("Dispatched {} task(s)", started);
            self.publish().await;
        }
        Ok(())
    }

    /// Wait for the next worker result, control command, stop, or poll tick.
    async fn wait(&mut self) -> Result<(), Halt> {
        let poll = self.config.execution.poll_interval;
        tokio::select! {
            Some(joined) = self.workers.join_next(), if !self.workers.is_empty() => {
                match joined {
                    Ok(Ok(report)) => self.on_worker(report).await,
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => {
                        // The task stays in_progress until the sweeper reclaims it
                        warn!("Worker task join error: {}", e);
                        Ok(())
                    }
                }
            }
            Some(signal) = self.commands.recv() => self.apply(signal).await,
            _ = self.token.cancelled() => Err(Halt::Stop("stop requested".into())),
            _ = tokio::time::sleep(poll) => Ok(()),
        }
    }

    async fn on_worker(&mut self, report: WorkerReport) -> Result<(), Halt> {
        if let WorkerOutcome::Escalated(reason) = &report.outcome {
            self.progress.on_task_failed(&report.task_id, reason);
        }
        // Results that land while paused are recorded but not counted
        if !self.session.state().is_active() {
            self.publish().await;
            return Ok(());
        }

        let iteration = self.session.tick(Utc::now())?;
        let max = self.config.execution.max_iterations;
        if max > 0 && iteration > max {
            return Err(Halt::Fail(format!("max iterations ({}) exceeded", max)));
        }

        let mut stagnant = false;
        if let Some(fingerprint) = self.probe.fingerprint().await {
            stagnant = self
                .council
                .record_iteration(iteration, &fingerprint)
                .await?
                .is_stagnant();
        }
        if matches!(self.session.state(), SessionState::Phase(_))
            && self.council.is_due(iteration, stagnant)
        {
            self.convene(iteration).await?;
        }
        self.publish().await;
        Ok(())
    }

    async fn convene(&mut self, iteration: u64) -> Result<(), Halt> {
        let brief = CouncilBrief {
            iteration,
            round: 0,
            phase_name: self.phase_name(),
            queue: self.queue.stats().await,
            dead_letters: self.dead_letters.clone(),
        };
        match self
            .council
            .check_convergence(iteration, brief, self.progress.as_ref())
            .await
        {
            Ok(round) => {
                self.last_council_outcome = Some(round.outcome());
                if round.is_complete() {
                    info!(
                        "Council declared the run complete at iteration {}",
                        iteration
                    );
                    self.session.begin_completion(Utc::now())?;
                    self.state_changed().await;
                }
                Ok(())
            }
            Err(CouncilError::Domain(e)) => {
                debug!("Continuing without a council decision: {}", e);
                Ok(())
            }
            Err(CouncilError::Store(e)) => Err(e.into()),
        }
    }

    async fn apply(&mut self, signal: ControlSignal) -> Result<(), Halt> {
        let now = Utc::now();
        let result = match signal {
            ControlSignal::Stop => return Err(Halt::Stop("stop requested".into())),
            ControlSignal::Pause if self.session.state().is_paused() => return Ok(()),
            ControlSignal::Pause => self.session.pause(now),
            ControlSignal::Resume if !self.session.state().is_paused() => return Ok(()),
            ControlSignal::Resume => self.session.resume(now),
        };
        match result {
            Ok(()) => {
                info!("Session {}", if signal == ControlSignal::Pause { "paused" } else { "resumed" });
                self.state_changed().await;
            }
            Err(e) => warn!("Ignoring {}: {}", signal, e),
        }
        Ok(())
    }

    fn phase_name(&self) -> Option<String> {
        match self.session.state() {
            SessionState::Idle | SessionState::Initializing | SessionState::Running => None,
            _ => self
                .backlog
                .phase_name(self.session.phase_index())
                .map(str::to_string),
        }
    }

    async fn state_changed(&self) {
        let state = self.session.state();
        self.progress.on_session_state(state);
        self.events.log(RunEvent::new(
            "session_state",
            json!({
                "session_id": self.session.id(),
                "state": state.label(),
                "iteration": self.session.iteration(),
                "reason": self.session.reason(),
            }),
        ));
        self.publish().await;
    }

    /// Publish the current status to the handle and persist it.
    async fn publish(&self) {
        let status = SessionStatus {
            session: self.session.clone(),
            phase_name: self.phase_name(),
            active_agents: self.controller.active_count().await,
            queue: self.queue.stats().await,
            provider: self.config.provider,
            last_council_outcome: self.last_council_outcome,
        };
        if let Err(e) = self.session_repo.save_status(&status).await {
            warn!("Failed to persist session status: {}", e);
        }
        self.status_tx.send_replace(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CouncilParams, ExecutionParams};
    use crate::ports::task_executor::ExecutionError;
    use crate::use_cases::test_support::{
        FixedMember, MemoryCouncilRepository, MemoryQueueRepository, MemorySessionRepository,
        ScriptedExecutor,
    };
    use async_trait::async_trait;
    use autopilot_domain::{Provider, RetryPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fixture {
        queue: Arc<MemoryQueueRepository>,
        council: Arc<MemoryCouncilRepository>,
        sessions: Arc<MemorySessionRepository>,
    }

    fn config(max_parallel: usize) -> RunConfig {
        RunConfig::new(Provider::Claude, max_parallel).with_execution(
            ExecutionParams::default().with_poll_interval(Duration::from_millis(50)),
        )
    }

    fn runner(config: RunConfig, executor: ScriptedExecutor) -> (SessionRunner, Fixture) {
        let fixture = Fixture {
            queue: Arc::new(MemoryQueueRepository::default()),
            council: Arc::new(MemoryCouncilRepository::default()),
            sessions: Arc::new(MemorySessionRepository::default()),
        };
        let runner = SessionRunner::new(
            config,
            Arc::new(executor),
            fixture.queue.clone(),
            fixture.council.clone(),
            fixture.sessions.clone(),
        );
        (runner, fixture)
    }

    fn backlog(json: &str) -> Backlog {
        Backlog::from_json(json).unwrap()
    }

    fn blocked(n: usize) -> Vec<Result<String, ExecutionError>> {
        (0..n)
            .map(|_| Ok("cannot proceed\nSTATUS: BLOCKED".to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_all_phases() {
        let (runner, fixture) = runner(config(2), ScriptedExecutor::default());
        let status = runner
            .run(backlog(
                r#"{"phases": [
                    {"name": "requirements", "tasks": ["write spec"]},
                    {"name": "empty", "tasks": []},
                    {"name": "implementation", "tasks": ["build a", "build b", "build c"]}
                ]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(status.state(), SessionState::Completed);
        assert_eq!(status.queue.completed, 4);
        assert_eq!(status.iteration(), 4);
        assert_eq!(status.session.phase_index(), 2);
        assert_eq!(status.active_agents, 0);

        let states: Vec<SessionState> = fixture
            .sessions
            .statuses
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.state())
            .collect();
        for expected in [
            SessionState::Initializing,
            SessionState::Running,
            SessionState::Phase(0),
            SessionState::Phase(1),
            SessionState::Phase(2),
            SessionState::Completing,
            SessionState::Completed,
        ] {
            assert!(states.contains(&expected), "missing {:?}", expected);
        }
        assert!(fixture.queue.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_letter_does_not_block_completion() {
        let executor = ScriptedExecutor::default().script("T1", blocked(5));
        let (runner, fixture) = runner(
            config(1).with_retry(RetryPolicy::new(1, Default::default())),
            executor,
        );
        let status = runner
            .run(backlog(
                r#"{"phases": [{"name": "impl", "tasks": [
                    {"id": "T1", "description": "impossible"},
                    {"id": "T2", "description": "easy"}
                ]}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(status.state(), SessionState::Completed);
        assert_eq!(status.queue.dead_letter, 1);
        assert_eq!(status.queue.completed, 1);
        assert_eq!(fixture.queue.dead_letters().len(), 1);
        assert_eq!(fixture.queue.dead_letters()[0].task.id.as_str(), "T1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhaustion_ends_session() {
        let executor = ScriptedExecutor::default().script("T1", blocked(10));
        let mut config = config(1);
        config.execution = config.execution.with_session_max_retries(2);
        let (runner, fixture) = runner(config, executor);

        let status = runner
            .run(backlog(
                r#"{"phases": [{"name": "impl", "tasks": [{"id": "T1", "description": "flaky"}]}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(status.state(), SessionState::MaxRetriesExceeded);
        assert!(status.session.reason().unwrap().contains("retries"));
        assert!(fixture.queue.dead_letters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_iterations_fails_session() {
        let mut config = config(1);
        config.execution = config.execution.with_max_iterations(1);
        let (runner, _) = runner(config, ScriptedExecutor::default());

        let status = runner
            .run(backlog(r#"{"phases": [{"name": "impl", "tasks": ["a", "b", "c"]}]}"#))
            .await
            .unwrap();

        assert_eq!(status.state(), SessionState::Failed);
        assert!(status.session.reason().unwrap().contains("max iterations"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_council_completes_run_early() {
        let council = CouncilParams::default()
            .with_interval(2)
            .with_min_iterations(2)
            .with_devils_advocate(false);
        let (runner, fixture) = runner(config(1).with_council(council), ScriptedExecutor::default());
        let members: Vec<Arc<dyn CouncilMember>> = vec![
            Arc::new(FixedMember::yes("a")),
            Arc::new(FixedMember::yes("b")),
            Arc::new(FixedMember::no("c")),
        ];
        let runner = runner.with_council(members, None);

        let status = runner
            .run(backlog(
                r#"{"phases": [{"name": "impl", "tasks": ["a", "b", "c", "d", "e", "f"]}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(status.state(), SessionState::Completed);
        assert_eq!(status.queue.completed, 2);
        assert_eq!(status.queue.queued, 4);
        assert_eq!(status.last_council_outcome, Some(RoundOutcome::Complete));
        assert_eq!(fixture.council.rounds().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quorum_miss_keeps_running() {
        let council = CouncilParams::default().with_interval(1).with_min_iterations(1);
        let (runner, fixture) = runner(config(1).with_council(council), ScriptedExecutor::default());
        // Fewer members than the council size never reach quorum
        let members: Vec<Arc<dyn CouncilMember>> = vec![Arc::new(FixedMember::yes("a"))];
        let runner = runner.with_council(members, None);

        let status = runner
            .run(backlog(r#"{"phases": [{"name": "impl", "tasks": ["a", "b"]}]}"#))
            .await
            .unwrap();

        assert_eq!(status.state(), SessionState::Completed);
        assert_eq!(status.queue.completed, 2);
        assert!(fixture.council.rounds().is_empty());
        assert_eq!(
            fixture.council.state.lock().unwrap().as_ref().unwrap().quorum_failures,
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_preserves_queue_and_iteration() {
        let executor = ScriptedExecutor::with_delay(Duration::from_secs(10));
        let (runner, fixture) = runner(config(1), executor);
        let handle = runner.handle();
        let run = tokio::spawn(runner.run(backlog(
            r#"{"phases": [{"name": "impl", "tasks": ["a", "b", "c"]}]}"#,
        )));

        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.iteration() >= 1).await.unwrap();
        assert!(handle.pause());
        rx.wait_for(|s| s.state() == SessionState::Paused && s.active_agents == 0)
            .await
            .unwrap();
        let paused = handle.status();

        tokio::time::sleep(Duration::from_secs(120)).await;
        let still = handle.status();
        assert_eq!(still.queue, paused.queue);
        assert_eq!(still.iteration(), paused.iteration());

        assert!(handle.resume());
        let status = run.await.unwrap().unwrap();
        assert_eq!(status.state(), SessionState::Completed);
        assert_eq!(status.queue.completed, 3);

        // The first status after resuming matches the last paused one
        let statuses = fixture.sessions.statuses.lock().unwrap().clone();
        let last_paused = statuses
            .iter()
            .rposition(|s| s.state() == SessionState::Paused)
            .unwrap();
        let resumed = &statuses[last_paused + 1];
        assert_eq!(resumed.state(), SessionState::Phase(0));
        assert_eq!(resumed.queue, statuses[last_paused].queue);
        assert_eq!(resumed.iteration(), statuses[last_paused].iteration());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_keeps_completed_work() {
        let executor = ScriptedExecutor::with_delay(Duration::from_secs(10));
        let (runner, _) = runner(config(2), executor);
        let handle = runner.handle();
        let run = tokio::spawn(runner.run(backlog(
            r#"{"phases": [{"name": "impl", "tasks": ["a", "b", "c", "d"]}]}"#,
        )));

        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.active_agents == 2).await.unwrap();
        handle.stop();

        let status = run.await.unwrap().unwrap();
        assert_eq!(status.state(), SessionState::Stopped);
        assert_eq!(status.session.reason(), Some("stop requested"));
        // In-flight agents finish their current step; nothing new starts
        assert_eq!(status.queue.completed, 2);
        assert_eq!(status.queue.queued, 2);
        assert!(!handle.pause());
    }

    struct StopAfter {
        polls: AtomicUsize,
        after: usize,
    }

    #[async_trait]
    impl ControlSource for StopAfter {
        async fn poll(&self) -> Option<ControlSignal> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            (n >= self.after).then_some(ControlSignal::Stop)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_source_stop() {
        let executor = ScriptedExecutor::with_delay(Duration::from_secs(10));
        let (runner, _) = runner(config(1), executor);
        let runner = runner.with_control_source(Arc::new(StopAfter {
            polls: AtomicUsize::new(0),
            after: 3,
        }));

        let status = runner
            .run(backlog(r#"{"phases": [{"name": "impl", "tasks": ["a", "b", "c"]}]}"#))
            .await
            .unwrap();

        assert_eq!(status.state(), SessionState::Stopped);
        assert!(status.queue.completed < 3);
    }
}

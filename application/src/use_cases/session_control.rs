//! Out-of-process session control
//!
//! Answers `status` from the persisted session snapshot and delivers
//! `pause`/`resume`/`stop` to a running process through a [`ControlSink`].
//! Requests are validated against the recorded state first, so an invalid
//! request fails here instead of being silently ignored by the runner.
//!
//! A session whose runner died (killed or rebooted) keeps an active state
//! on disk with nobody polling for signals. `stop` detects this through the
//! [`RunnerLiveness`] and records the session as stopped itself.

use crate::ports::control::{AssumeRunnerAlive, ControlSignal, ControlSink, RunnerLiveness};
use crate::ports::state_store::{QueueRepository, SessionRepository};
use crate::use_cases::session_runner::SessionError;
use autopilot_domain::{DeadLetterEntry, SessionState, SessionStatus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// How `stop` was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The session was already terminal
    AlreadyFinished,
    /// A live runner was asked to stop
    Requested,
    /// No runner owned the session; it was marked stopped directly
    Recovered,
}

pub struct SessionControlUseCase {
    sessions: Arc<dyn SessionRepository>,
    queue: Arc<dyn QueueRepository>,
    control: Arc<dyn ControlSink>,
    runner: Arc<dyn RunnerLiveness>,
}

impl SessionControlUseCase {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        queue: Arc<dyn QueueRepository>,
        control: Arc<dyn ControlSink>,
    ) -> Self {
        Self {
            sessions,
            queue,
            control,
            runner: Arc::new(AssumeRunnerAlive),
        }
    }

    pub fn with_runner_liveness(mut self, runner: Arc<dyn RunnerLiveness>) -> Self {
        self.runner = runner;
        self
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        self.sessions
            .load_status()
            .await?
            .ok_or(SessionError::NoSession)
    }

    /// Signal pause. Pausing a paused session is a no-op.
    pub async fn pause(&self) -> Result<SessionStatus, SessionError> {
        let status = self.status().await?;
        if status.state().is_paused() {
            return Ok(status);
        }
        status.session.clone().pause(Utc::now())?;
        self.signal(ControlSignal::Pause).await?;
        Ok(status)
    }

    /// Signal resume. Resuming an active session is a no-op.
    pub async fn resume(&self) -> Result<SessionStatus, SessionError> {
        let status = self.status().await?;
        if status.state().is_active() {
            return Ok(status);
        }
        status.session.clone().resume(Utc::now())?;
        self.signal(ControlSignal::Resume).await?;
        Ok(status)
    }

    /// Stop the session. Stopping a terminal session is a no-op.
    ///
    /// With a live runner this only signals it; the runner records the
    /// `stopped` state itself after draining. Without one the session is
    /// marked `stopped` here.
    pub async fn stop(&self) -> Result<(SessionStatus, StopOutcome), SessionError> {
        let status = self.status().await?;
        if status.state().is_terminal() {
            return Ok((status, StopOutcome::AlreadyFinished));
        }
        if self.runner.runner_alive().await {
            self.signal(ControlSignal::Stop).await?;
            return Ok((status, StopOutcome::Requested));
        }
        warn!(
            "No runner owns session {} ({}); marking it stopped",
            status.session.id(),
            status.state()
        );
        let status = self.mark_stopped(status, "runner exited without stopping").await?;
        Ok((status, StopOutcome::Recovered))
    }

    /// Return a terminal session to `idle`.
    ///
    /// Clears the queue, council and pending control signals. The dead-letter
    /// log, the event log and the council report are kept.
    ///
    /// With `force`, a non-terminal session is stopped first even when its
    /// runner looks alive. Use it when the liveness check cannot be trusted.
    pub async fn reset(&self, force: bool) -> Result<SessionStatus, SessionError> {
        let mut current = self.status().await?;
        if !current.state().is_terminal() && (force || !self.runner.runner_alive().await) {
            current = self.mark_stopped(current, "reset without a running session").await?;
        }
        let mut session = current.session;
        session.reset(Utc::now())?;

        self.sessions.clear_run_state().await?;
        self.control.clear().await?;
        let status = SessionStatus::new(session, current.provider);
        self.sessions.save_status(&status).await?;
        info!("Session {} reset to idle", status.session.id());
        Ok(status)
    }

    /// Whether a new run may take over the recorded session.
    pub async fn can_start(&self) -> Result<bool, SessionError> {
        let Some(status) = self.sessions.load_status().await? else {
            return Ok(true);
        };
        let state = status.state();
        Ok(state.is_terminal()
            || state == SessionState::Idle
            || !self.runner.runner_alive().await)
    }

    async fn mark_stopped(
        &self,
        mut status: SessionStatus,
        reason: &str,
    ) -> Result<SessionStatus, SessionError> {
        status.session.stop(reason, Utc::now());
        status.active_agents = 0;
        self.sessions.save_status(&status).await?;
        self.control.clear().await?;
        Ok(status)
    }

    pub async fn dead_letters(&self) -> Result<Vec<DeadLetterEntry>, SessionError> {
        Ok(self.queue.load_dead_letters().await?)
    }

    async fn signal(&self, signal: ControlSignal) -> Result<(), SessionError> {
        self.control.send(signal).await?;
        info!("Sent {} signal", signal);
        Ok(())
    }
}

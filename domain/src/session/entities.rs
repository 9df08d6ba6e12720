//! Session entity and its state machine

use super::state::SessionState;
use crate::core::error::DomainError;
use crate::core::ids::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single top-level session of a run.
///
/// All transitions validate the current state; a rejected transition leaves
/// the session untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    phase_index: usize,
    phase_count: usize,
    iteration: u64,
    /// State to return to on resume
    resume_to: Option<SessionState>,
    /// Why the session ended up failed/stopped
    reason: Option<String>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            phase_index: 0,
            phase_count: 0,
            iteration: 0,
            resume_to: None,
            reason: None,
            started_at: now,
            updated_at: now,
        }
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// `true` while the session sits in the last phase
    pub fn in_last_phase(&self) -> bool {
        matches!(self.state, SessionState::Phase(n) if n + 1 >= self.phase_count)
    }

    // ==================== Transitions ====================

    fn set(&mut self, next: SessionState, now: DateTime<Utc>) {
        self.state = next;
        self.updated_at = now;
    }

    fn reject(&self, to: impl std::fmt::Display) -> DomainError {
        DomainError::transition("session", self.state, to)
    }

    /// `idle → initializing`
    pub fn initialize(&mut self, phase_count: usize, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state != SessionState::Idle {
            return Err(self.reject(SessionState::Initializing));
        }
        self.phase_count = phase_count;
        self.phase_index = 0;
        self.iteration = 0;
        self.reason = None;
        self.started_at = now;
        self.set(SessionState::Initializing, now);
        Ok(())
    }

    /// `initializing → running`
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state != SessionState::Initializing {
            return Err(self.reject(SessionState::Running));
        }
        self.set(SessionState::Running, now);
        Ok(())
    }

    /// `running → phase_0` or `phase_n → phase_n+1`.
    ///
    /// Leaving a phase requires `current_resolved`: every task of the phase
    /// is completed or dead-lettered. Returns the new phase index.
    pub fn advance_phase(
        &mut self,
        current_resolved: bool,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let next = match self.state {
            SessionState::Running => 0,
            SessionState::Phase(n) => {
                if !current_resolved {
                    return Err(self.reject(format!(
                        "{} (phase {} has unresolved tasks)",
                        SessionState::Phase(n + 1),
                        n
                    )));
                }
                n + 1
            }
            _ => return Err(self.reject("next phase")),
        };
        if next >= self.phase_count {
            return Err(self.reject(SessionState::Phase(next)));
        }
        self.phase_index = next;
        self.set(SessionState::Phase(next), now);
        Ok(next)
    }

    /// `running | phase_n → completing`
    pub fn begin_completion(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.state {
            SessionState::Running | SessionState::Phase(_) => {
                self.set(SessionState::Completing, now);
                Ok(())
            }
            _ => Err(self.reject(SessionState::Completing)),
        }
    }

    /// `completing → completed`
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state != SessionState::Completing {
            return Err(self.reject(SessionState::Completed));
        }
        self.set(SessionState::Completed, now);
        Ok(())
    }

    /// Active or paused → `paused`. Pausing a paused session is a no-op.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.state {
            SessionState::Paused => Ok(()),
            state if state.is_active() => {
                self.resume_to = Some(state);
                self.set(SessionState::Paused, now);
                Ok(())
            }
            _ => Err(self.reject(SessionState::Paused)),
        }
    }

    /// `paused →` the state it was paused from. Resuming an active session
    /// is a no-op.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.state {
            SessionState::Paused => {
                let back = self.resume_to.take().unwrap_or(SessionState::Running);
                self.set(back, now);
                Ok(())
            }
            state if state.is_active() => Ok(()),
            _ => Err(self.reject("resumed")),
        }
    }

    /// Error while working → `failed`
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.state {
            SessionState::Initializing | SessionState::Paused => {}
            state if state.is_active() => {}
            _ => return Err(self.reject(SessionState::Failed)),
        }
        self.reason = Some(reason.into());
        self.resume_to = None;
        self.set(SessionState::Failed, now);
        Ok(())
    }

    /// Retry budget exhausted → `max_retries_exceeded`
    pub fn exceed_max_retries(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match self.state {
            SessionState::Paused => {}
            state if state.is_active() => {}
            _ => return Err(self.reject(SessionState::MaxRetriesExceeded)),
        }
        self.reason = Some(reason.into());
        self.resume_to = None;
        self.set(SessionState::MaxRetriesExceeded, now);
        Ok(())
    }

    /// Any non-terminal state → `stopped`. Stopping a terminal session is a
    /// no-op.
    pub fn stop(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        if self.state.is_terminal() {
            return;
        }
        self.reason = Some(reason.into());
        self.resume_to = None;
        self.set(SessionState::Stopped, now);
    }

    /// Terminal → `idle`, clearing phase and iteration progress.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.state.is_terminal() {
            return Err(self.reject(SessionState::Idle));
        }
        self.phase_index = 0;
        self.iteration = 0;
        self.reason = None;
        self.set(SessionState::Idle, now);
        Ok(())
    }

    /// Count one iteration. Only active sessions iterate.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        if !self.state.is_active() {
            return Err(self.reject("next iteration"));
        }
        self.iteration += 1;
        self.updated_at = now;
        Ok(self.iteration)
    }
}
